//! Voice processing module
//!
//! Microphone capture and segmentation, remote transcription and synthesis,
//! and speaker playback. The run loop only sees [`SpeechInput`] and
//! [`SpeechOutput`].

mod capture;
mod input;
mod output;
mod playback;
mod segmenter;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, calculate_rms, samples_to_wav};
pub use input::{MicrophoneInput, SpeechInput, TextInput};
pub use output::{SpeechOutput, VoiceOutput};
pub use playback::{AudioPlayback, DecodedAudio, decode_mp3};
pub use segmenter::{SegmentEvent, SegmenterState, SpeechSegmenter, calibrate_threshold};
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
