//! EMORA - an emotion-aware voice assistant
//!
//! This library provides the pieces of the assistant:
//! - Wake/stop session state machine
//! - Lexicon-based emotion classification
//! - Remote chat completion with canned per-emotion fallbacks
//! - Voice I/O (capture, transcription, synthesis, playback)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Assistant                    │
//! │   SpeechInput  →  Conversation  →  SpeechOutput│
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────┐
//! │   decide()  │  EmotionClassifier  │  Replies  │
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────┐
//! │     Groq (LLM, Whisper)  │  ElevenLabs (TTS)  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod config;
pub mod conversation;
pub mod emotion;
pub mod error;
pub mod reply;
pub mod voice;

pub use assistant::{Assistant, GREETING, RunOutcome};
pub use config::Config;
pub use conversation::{Conversation, Decision, SessionState, TurnOutcome, decide};
pub use emotion::{Emotion, EmotionClassifier};
pub use error::{CaptureError, Error, Result};
