//! Error types for Emora

use thiserror::Error;

/// Result type alias for Emora operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Emora
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Remote completion error (network, auth, or malformed response)
    #[error("completion error: {0}")]
    Completion(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Why a capture window produced no utterance
///
/// The run loop treats every variant except [`CaptureError::Closed`] as
/// "no utterance"; the distinction only shows up in logs.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Nothing above the energy threshold before the listen timeout
    #[error("no speech detected")]
    NoSpeech,

    /// Speech was captured but the recognizer returned no text
    #[error("could not understand audio")]
    Unintelligible,

    /// The input source is exhausted (end of typed input)
    #[error("input closed")]
    Closed,

    /// Microphone or recognition service failure
    #[error("recognition service error: {0}")]
    Service(#[from] Error),
}
