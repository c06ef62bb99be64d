//! Conversation state machine
//!
//! Each recognized utterance is one turn. [`decide`] is a pure reducer over
//! [`SessionState`] that classifies the turn as a wake trigger, an engaged
//! query, a stop command, a timeout, or noise. [`Conversation`] owns the state
//! and resolves query turns through the emotion classifier and reply source.
//!
//! ```text
//!              wake phrase                    wake phrase (re-arm)
//!   DORMANT ───────────────▶ ENGAGED ◀───────────────┐
//!      ▲                       │  │                  │
//!      │   counter reaches 0   │  └──────────────────┘
//!      └───────────────────────┘
//! ```
//!
//! Wake phrases and stop words match by plain substring containment, so
//! "stopwatch" contains the stop word "stop".

use crate::config::SessionConfig;
use crate::emotion::{Emotion, EmotionClassifier};
use crate::reply::ReplySource;

/// Spoken when a wake phrase arrives with nothing else
pub const ACK_REPLY: &str = "Yes, I'm listening.";

/// Spoken when an engaged session times out
pub const SLEEP_REPLY: &str = "Going back to sleep.";

/// Spoken before the assistant exits on a stop word
pub const FAREWELL_REPLY: &str = "Goodbye. Take care.";

/// Conversation state carried from turn to turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    /// Whether a conversation is open
    pub active: bool,
    /// Turns left before the session closes; only meaningful while active
    pub timeout_counter: i32,
}

impl SessionState {
    /// Initial state: no open session
    pub const DORMANT: Self = Self {
        active: false,
        timeout_counter: 0,
    };

    /// Freshly (re-)armed session
    #[must_use]
    pub const fn engaged(timeout_turns: i32) -> Self {
        Self {
            active: true,
            timeout_counter: timeout_turns,
        }
    }
}

/// What a single turn calls for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Not addressed to the assistant; say nothing
    Ignore,
    /// Bare wake phrase; acknowledge
    Acknowledge,
    /// Session timed out; announce and go dormant
    Sleep,
    /// Stop word heard; say goodbye and end the run loop
    Farewell,
    /// Answer this query
    Query(String),
}

/// Apply one utterance to `state`
///
/// Pure: the caller decides what to do with the returned [`Decision`].
#[must_use]
pub fn decide(
    config: &SessionConfig,
    state: SessionState,
    utterance: &str,
) -> (SessionState, Decision) {
    let text = utterance.to_lowercase();

    let (next, query) = if contains_any(&text, &config.wake_phrases) {
        let next = SessionState::engaged(config.timeout_turns.max(1));
        let query = strip_phrases(&text, &config.wake_phrases);
        if query.is_empty() {
            return (next, Decision::Acknowledge);
        }
        (next, query)
    } else if state.active {
        let counter = state.timeout_counter - 1;
        if counter <= 0 {
            return (SessionState::DORMANT, Decision::Sleep);
        }
        (SessionState::engaged(counter), text.trim().to_string())
    } else {
        return (state, Decision::Ignore);
    };

    if contains_any(&query, &config.stop_words) {
        return (SessionState::DORMANT, Decision::Farewell);
    }

    (next, Decision::Query(query))
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Text to speak, if any
    pub reply: Option<String>,
    /// Emotion of the query, for turns that reached the reply source
    pub emotion: Option<Emotion>,
    /// The run loop must stop after speaking `reply`
    pub terminal: bool,
}

impl TurnOutcome {
    /// Turn with nothing to say
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            reply: None,
            emotion: None,
            terminal: false,
        }
    }

    fn say(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            emotion: None,
            terminal: false,
        }
    }
}

/// Owns the session state and answers turns
pub struct Conversation {
    config: SessionConfig,
    state: SessionState,
    classifier: EmotionClassifier,
    replies: ReplySource,
}

impl Conversation {
    /// Start a dormant conversation
    #[must_use]
    pub fn new(config: SessionConfig, classifier: EmotionClassifier, replies: ReplySource) -> Self {
        Self {
            config,
            state: SessionState::DORMANT,
            classifier,
            replies,
        }
    }

    /// Current session state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Process one recognized utterance
    ///
    /// Blank utterances are a no-op, like a failed capture.
    pub async fn handle(&mut self, utterance: &str) -> TurnOutcome {
        if utterance.trim().is_empty() {
            return TurnOutcome::silent();
        }

        let (next, decision) = decide(&self.config, self.state, utterance);
        let previous = std::mem::replace(&mut self.state, next);

        match decision {
            Decision::Ignore => {
                tracing::trace!(utterance, "not addressed, ignoring");
                TurnOutcome::silent()
            }
            Decision::Acknowledge => {
                tracing::info!(was_active = previous.active, "wake phrase detected");
                TurnOutcome::say(ACK_REPLY)
            }
            Decision::Sleep => {
                tracing::info!("session timed out");
                TurnOutcome::say(SLEEP_REPLY)
            }
            Decision::Farewell => {
                tracing::info!("stop word detected");
                TurnOutcome {
                    terminal: true,
                    ..TurnOutcome::say(FAREWELL_REPLY)
                }
            }
            Decision::Query(query) => {
                tracing::debug!(
                    query = %query,
                    remaining = self.state.timeout_counter,
                    "engaged turn"
                );
                let emotion = self.classifier.classify(&query);
                tracing::info!(%emotion, "emotion");

                let reply = self.replies.get_reply(&query, emotion).await;
                tracing::info!(reply = %reply, "reply");

                TurnOutcome {
                    reply: Some(reply),
                    emotion: Some(emotion),
                    terminal: false,
                }
            }
        }
    }
}

fn contains_any(text: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|n| !n.is_empty() && text.contains(n.as_str()))
}

/// Remove every phrase occurrence, longest phrase first, and tidy whitespace
///
/// Longest-first keeps "memora" from being left as a stray "m" after "emora"
/// is removed. This departs on purpose from stripping in configured order,
/// and inner whitespace is collapsed rather than only trimmed at the ends.
fn strip_phrases(text: &str, phrases: &[String]) -> String {
    let mut ordered: Vec<&str> = phrases
        .iter()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .collect();
    ordered.sort_by_key(|p| std::cmp::Reverse(p.len()));

    let stripped = ordered
        .into_iter()
        .fold(text.to_string(), |acc, phrase| acc.replace(phrase, " "));

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
