//! TOML configuration file loading
//!
//! Supports `~/.config/emora/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct EmoraConfigFile {
    /// Wake/stop vocabulary and session length
    #[serde(default)]
    pub session: SessionFileConfig,

    /// Microphone listening behavior
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Conversation session configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Phrases that open or re-arm a session (e.g. "emora")
    pub wake_phrases: Option<Vec<String>>,

    /// Words that end the session
    pub stop_words: Option<Vec<String>>,

    /// Turns without a wake phrase before the session closes
    pub timeout_turns: Option<i32>,
}

/// Listening configuration
#[derive(Debug, Default, Deserialize)]
pub struct ListenFileConfig {
    /// Seconds to wait for speech to start
    pub timeout_secs: Option<f32>,

    /// Maximum seconds of a single phrase
    pub phrase_limit_secs: Option<f32>,

    /// RMS energy above which a chunk counts as speech
    pub energy_threshold: Option<f32>,

    /// Raise the threshold above measured room noise before each listen
    pub dynamic_threshold: Option<bool>,

    /// Seconds of room noise sampled for calibration
    pub calibration_secs: Option<f32>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// OpenAI-compatible API base URL
    pub base_url: Option<String>,

    /// Model identifier (e.g. "llama-3.1-8b-instant")
    pub model: Option<String>,

    /// Completion token cap
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Speech recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// Transcription model (e.g. "whisper-large-v3")
    pub model: Option<String>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// `ElevenLabs` voice identifier
    pub voice_id: Option<String>,

    /// `ElevenLabs` model identifier
    pub model: Option<String>,

    /// `ElevenLabs` output format (e.g. "`mp3_44100_128`")
    pub output_format: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub groq: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `EmoraConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> EmoraConfigFile {
    let Some(path) = config_file_path() else {
        return EmoraConfigFile::default();
    };

    if !path.exists() {
        return EmoraConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            EmoraConfigFile::default()
        }
    }
}

/// Read and parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<EmoraConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/emora/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("emora").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let fc: EmoraConfigFile = toml::from_str(
            r#"
            [session]
            timeout_turns = 3

            [llm]
            model = "llama-3.3-70b-versatile"
            "#,
        )
        .unwrap();

        assert_eq!(fc.session.timeout_turns, Some(3));
        assert!(fc.session.wake_phrases.is_none());
        assert_eq!(fc.llm.model.as_deref(), Some("llama-3.3-70b-versatile"));
        assert!(fc.api_keys.groq.is_none());
    }

    #[test]
    fn test_read_config_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tts]\nvoice_id = \"abc\"\n").unwrap();

        let fc = read_config_file(&path).unwrap();
        assert_eq!(fc.tts.voice_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_read_config_file_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session\n").unwrap();

        assert!(read_config_file(&path).is_err());
    }
}
