//! Emotion classification
//!
//! Maps an utterance to one of three emotions by bucketing a sentiment
//! polarity score in `[-1.0, 1.0]`. The scorer is pluggable; the thresholds
//! are fixed.

use std::fmt;

/// Polarity above this is [`Emotion::Joy`]
pub const JOY_THRESHOLD: f32 = 0.3;

/// Polarity below this is [`Emotion::Sadness`]
pub const SADNESS_THRESHOLD: f32 = -0.3;

/// Emotional tone of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Joy,
    Sadness,
    Calm,
}

impl Emotion {
    /// All emotions, in table order
    pub const ALL: [Self; 3] = [Self::Joy, Self::Sadness, Self::Calm];

    /// Bucket a polarity score; both thresholds are exclusive
    #[must_use]
    pub fn from_polarity(score: f32) -> Self {
        if score > JOY_THRESHOLD {
            Self::Joy
        } else if score < SADNESS_THRESHOLD {
            Self::Sadness
        } else {
            Self::Calm
        }
    }

    /// Display name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Joy => "Joy",
            Self::Sadness => "Sadness",
            Self::Calm => "Calm",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces a sentiment polarity score for text
pub trait PolarityScorer: Send + Sync {
    /// Score in `[-1.0, 1.0]`; 0.0 is neutral
    fn polarity(&self, text: &str) -> f32;
}

/// Classifies utterances into emotions
pub struct EmotionClassifier {
    scorer: Box<dyn PolarityScorer>,
}

impl EmotionClassifier {
    /// Create a classifier backed by `scorer`
    #[must_use]
    pub fn new(scorer: Box<dyn PolarityScorer>) -> Self {
        Self { scorer }
    }

    /// Classify `text`
    pub fn classify(&self, text: &str) -> Emotion {
        let score = self.scorer.polarity(text);
        let emotion = Emotion::from_polarity(score);
        tracing::debug!(score, %emotion, "classified emotion");
        emotion
    }
}

impl Default for EmotionClassifier {
    fn default() -> Self {
        Self::new(Box::new(LexiconScorer))
    }
}

/// Word polarities, roughly on the scale of common adjective lexicons
const LEXICON: &[(&str, f32)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("brilliant", 0.9),
    ("cheerful", 0.6),
    ("delighted", 0.7),
    ("enjoy", 0.4),
    ("excellent", 1.0),
    ("excited", 0.375),
    ("fantastic", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("love", 0.5),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("pleased", 0.5),
    ("proud", 0.8),
    ("wonderful", 1.0),
    ("angry", -0.5),
    ("annoyed", -0.4),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("depressed", -0.6),
    ("disappointed", -0.75),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("hurt", -0.5),
    ("lonely", -0.5),
    ("miserable", -1.0),
    ("sad", -0.5),
    ("sick", -0.7),
    ("stressed", -0.5),
    ("terrible", -1.0),
    ("tired", -0.4),
    ("unhappy", -0.6),
    ("upset", -0.5),
    ("worried", -0.5),
    ("worse", -0.4),
    ("worst", -1.0),
];

/// Words that scale the next scored word
const INTENSIFIERS: &[(&str, f32)] = &[
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("quite", 1.1),
    ("really", 1.3),
    ("so", 1.3),
    ("super", 1.3),
    ("too", 1.2),
    ("very", 1.3),
];

/// Words that flip the next scored word
const NEGATIONS: &[&str] = &["never", "no", "not", "nothing"];

/// Flipped polarity is damped, so "not good" is mildly negative
const NEGATION_FACTOR: f32 = -0.5;

/// Lexicon-based polarity scorer
///
/// Averages the polarity of every lexicon word found, after applying any
/// preceding intensifier and negation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f32 {
        let lower = text.to_lowercase();
        let mut scores = Vec::new();
        let mut intensity = 1.0_f32;
        let mut negated = false;

        for token in lower
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
        {
            if NEGATIONS.contains(&token) || token.ends_with("n't") {
                negated = true;
                continue;
            }

            if let Some((_, factor)) = INTENSIFIERS.iter().find(|(w, _)| *w == token) {
                intensity *= factor;
                continue;
            }

            if let Some((_, polarity)) = LEXICON.iter().find(|(w, _)| *w == token) {
                let mut score = polarity * intensity;
                if negated {
                    score *= NEGATION_FACTOR;
                }
                scores.push(score);
                intensity = 1.0;
                negated = false;
            }
        }

        if scores.is_empty() {
            return 0.0;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = scores.iter().sum::<f32>() / scores.len() as f32;
        mean.clamp(-1.0, 1.0)
    }
}
