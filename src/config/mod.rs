//! Configuration management for Emora

pub mod file;

use std::path::Path;
use std::time::Duration;

use crate::Result;
use file::EmoraConfigFile;

/// Default wake phrases, including common mis-hearings of the name
pub const DEFAULT_WAKE_PHRASES: &[&str] = &["emora", "memora", "amora", "imora"];

/// Default stop words
pub const DEFAULT_STOP_WORDS: &[&str] = &["bye", "goodbye", "stop", "exit"];

/// Default number of turns an engaged session survives without a wake phrase
pub const DEFAULT_TIMEOUT_TURNS: i32 = 6;

/// Groq's OpenAI-compatible API root
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Persona instruction sent with every completion
pub const SYSTEM_PROMPT: &str = "You are EMORA, a friendly and helpful voice assistant.";

/// Emora configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Conversation session rules
    pub session: SessionConfig,

    /// Microphone listening behavior
    pub listen: ListenConfig,

    /// Language model settings
    pub llm: LlmConfig,

    /// Speech recognition settings
    pub stt: SttConfig,

    /// Speech synthesis settings
    pub tts: TtsConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Wake/stop vocabulary and session length
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lowercased wake phrases
    pub wake_phrases: Vec<String>,

    /// Lowercased stop words
    pub stop_words: Vec<String>,

    /// Turns an engaged session survives without a wake phrase
    pub timeout_turns: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wake_phrases: DEFAULT_WAKE_PHRASES.iter().map(ToString::to_string).collect(),
            stop_words: DEFAULT_STOP_WORDS.iter().map(ToString::to_string).collect(),
            timeout_turns: DEFAULT_TIMEOUT_TURNS,
        }
    }
}

/// Microphone listening configuration
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// How long to wait for speech to start
    pub timeout: Duration,

    /// Upper bound on a single phrase
    pub phrase_limit: Duration,

    /// RMS energy above which a chunk counts as speech
    pub energy_threshold: f32,

    /// Raise the threshold above measured room noise before each listen
    pub dynamic_threshold: bool,

    /// How much room noise to sample for calibration
    pub calibration: Duration,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            phrase_limit: Duration::from_secs(12),
            energy_threshold: 0.03,
            dynamic_threshold: true,
            calibration: Duration::from_secs(1),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible API root
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Completion token cap
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Hard timeout on a single completion request
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            max_tokens: 200,
            temperature: 0.7,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Speech recognition configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Transcription model served from the LLM API root
    pub model: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "whisper-large-v3".to_string(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// `ElevenLabs` voice identifier
    pub voice_id: String,

    /// `ElevenLabs` model identifier
    pub model: String,

    /// `ElevenLabs` output format
    pub output_format: String,

    /// Hard timeout on a single synthesis request
    pub timeout: Duration,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
            model: "eleven_turbo_v2_5".to_string(),
            output_format: "mp3_44100_128".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// API keys for external services
///
/// Both are optional; a missing key switches the matching feature to its
/// degraded mode instead of failing startup.
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// Groq API key (completion and transcription)
    pub groq: Option<String>,

    /// `ElevenLabs` API key (speech synthesis)
    pub elevenlabs: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("groq", &self.groq.as_ref().map(|_| "<redacted>"))
            .field("elevenlabs", &self.elevenlabs.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from the standard file location and environment
    ///
    /// With `path` set, that file must exist and parse; otherwise the default
    /// location is read if present.
    ///
    /// # Errors
    ///
    /// Returns error if an explicitly requested config file cannot be loaded
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(p) => {
                let fc = file::read_config_file(p)?;
                tracing::info!(path = %p.display(), "loaded config file");
                fc
            }
            None => file::load_config_file(),
        };

        Ok(Self::from_sources(fc, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed config file with environment lookups (env > toml > default)
    pub fn from_sources(fc: EmoraConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            groq: non_empty("GROQ_API_KEY").or(fc.api_keys.groq),
            elevenlabs: non_empty("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs),
        };

        let session = SessionConfig {
            wake_phrases: normalize_words(
                non_empty("EMORA_WAKE_PHRASES")
                    .map(|s| split_list(&s))
                    .or(fc.session.wake_phrases)
                    .unwrap_or(defaults.session.wake_phrases),
            ),
            stop_words: normalize_words(
                non_empty("EMORA_STOP_WORDS")
                    .map(|s| split_list(&s))
                    .or(fc.session.stop_words)
                    .unwrap_or(defaults.session.stop_words),
            ),
            timeout_turns: non_empty("EMORA_TIMEOUT_TURNS")
                .and_then(|s| s.parse().ok())
                .or(fc.session.timeout_turns)
                .unwrap_or(defaults.session.timeout_turns),
        };

        let listen = ListenConfig {
            timeout: fc
                .listen
                .timeout_secs
                .and_then(secs)
                .unwrap_or(defaults.listen.timeout),
            phrase_limit: fc
                .listen
                .phrase_limit_secs
                .and_then(secs)
                .unwrap_or(defaults.listen.phrase_limit),
            energy_threshold: fc
                .listen
                .energy_threshold
                .unwrap_or(defaults.listen.energy_threshold),
            dynamic_threshold: fc
                .listen
                .dynamic_threshold
                .unwrap_or(defaults.listen.dynamic_threshold),
            calibration: fc
                .listen
                .calibration_secs
                .and_then(secs)
                .unwrap_or(defaults.listen.calibration),
        };

        let llm = LlmConfig {
            base_url: non_empty("EMORA_API_BASE")
                .or(fc.llm.base_url)
                .unwrap_or(defaults.llm.base_url),
            model: non_empty("EMORA_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or(defaults.llm.model),
            max_tokens: fc.llm.max_tokens.unwrap_or(defaults.llm.max_tokens),
            temperature: fc.llm.temperature.unwrap_or(defaults.llm.temperature),
            timeout: fc
                .llm
                .timeout_secs
                .map_or(defaults.llm.timeout, Duration::from_secs),
        };

        let stt = SttConfig {
            model: non_empty("EMORA_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or(defaults.stt.model),
        };

        let tts = TtsConfig {
            voice_id: non_empty("EMORA_TTS_VOICE")
                .or(fc.tts.voice_id)
                .unwrap_or(defaults.tts.voice_id),
            model: fc.tts.model.unwrap_or(defaults.tts.model),
            output_format: fc.tts.output_format.unwrap_or(defaults.tts.output_format),
            timeout: fc
                .tts
                .timeout_secs
                .map_or(defaults.tts.timeout, Duration::from_secs),
        };

        Self {
            session,
            listen,
            llm,
            stt,
            tts,
            api_keys,
        }
    }
}

/// Split a comma-separated list
fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(ToString::to_string).collect()
}

/// Lowercase, trim, and drop empty entries
fn normalize_words(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Positive, finite seconds to a `Duration`
fn secs(value: f32) -> Option<Duration> {
    (value.is_finite() && value > 0.0).then(|| Duration::from_secs_f32(value))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = Config::from_sources(EmoraConfigFile::default(), env_from(&[]));

        assert_eq!(config.session.wake_phrases, DEFAULT_WAKE_PHRASES);
        assert_eq!(config.session.stop_words, DEFAULT_STOP_WORDS);
        assert_eq!(config.session.timeout_turns, 6);
        assert_eq!(config.listen.timeout, Duration::from_secs(10));
        assert_eq!(config.listen.phrase_limit, Duration::from_secs(12));
        assert_eq!(config.llm.max_tokens, 200);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.api_keys.groq.is_none());
        assert!(config.api_keys.elevenlabs.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: EmoraConfigFile = toml::from_str(
            r#"
            [api_keys]
            groq = "from-file"

            [session]
            timeout_turns = 3
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env_from(&[("GROQ_API_KEY", "from-env"), ("EMORA_TIMEOUT_TURNS", "9")]),
        );

        assert_eq!(config.api_keys.groq.as_deref(), Some("from-env"));
        assert_eq!(config.session.timeout_turns, 9);
    }

    #[test]
    fn test_tts_timeout_from_file() {
        let fc: EmoraConfigFile = toml::from_str("[tts]\ntimeout_secs = 4\n").unwrap();
        let config = Config::from_sources(fc, env_from(&[]));
        assert_eq!(config.tts.timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_blank_env_key_is_absent() {
        let config =
            Config::from_sources(EmoraConfigFile::default(), env_from(&[("GROQ_API_KEY", "  ")]));
        assert!(config.api_keys.groq.is_none());
    }

    #[test]
    fn test_word_lists_are_normalized() {
        let config = Config::from_sources(
            EmoraConfigFile::default(),
            env_from(&[("EMORA_WAKE_PHRASES", " Hey Emora , ,JARVIS")]),
        );
        assert_eq!(config.session.wake_phrases, vec!["hey emora", "jarvis"]);
    }

    #[test]
    fn test_invalid_durations_fall_back() {
        let fc: EmoraConfigFile = toml::from_str(
            r"
            [listen]
            timeout_secs = -1.0
            phrase_limit_secs = 4.5
            ",
        )
        .unwrap();

        let config = Config::from_sources(fc, env_from(&[]));
        assert_eq!(config.listen.timeout, Duration::from_secs(10));
        assert_eq!(config.listen.phrase_limit, Duration::from_millis(4500));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let keys = ApiKeys {
            groq: Some("secret".to_string()),
            elevenlabs: None,
        };
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("redacted"));
    }
}
