//! Reply delivery

use async_trait::async_trait;

use super::playback::AudioPlayback;
use super::tts::TextToSpeech;
use crate::Result;

/// Sink for assistant replies
#[async_trait(?Send)]
pub trait SpeechOutput {
    /// Deliver `text` to the user, returning once it has been played
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, text: &str) -> Result<()>;
}

/// Logs each reply and, when a voice is configured, speaks it
pub struct VoiceOutput {
    voice: Option<(TextToSpeech, AudioPlayback)>,
}

impl VoiceOutput {
    /// Speak through `tts` on the default output device
    #[must_use]
    pub const fn spoken(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self {
            voice: Some((tts, playback)),
        }
    }

    /// Print replies only
    #[must_use]
    pub const fn text_only() -> Self {
        Self { voice: None }
    }

    /// Whether replies are synthesized
    #[must_use]
    pub const fn is_spoken(&self) -> bool {
        self.voice.is_some()
    }
}

#[async_trait(?Send)]
impl SpeechOutput for VoiceOutput {
    async fn speak(&mut self, text: &str) -> Result<()> {
        tracing::info!("EMORA: {text}");

        let Some((tts, playback)) = &self.voice else {
            return Ok(());
        };

        let audio = tts.synthesize(text).await?;
        playback.play_mp3(&audio).await
    }
}
