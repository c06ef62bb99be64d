//! Utterance capture
//!
//! A [`SpeechInput`] produces one lowercase utterance per call, or a
//! [`CaptureError`] explaining why it could not.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::segmenter::{SegmentEvent, SpeechSegmenter, calibrate_threshold};
use super::stt::SpeechToText;
use crate::config::ListenConfig;
use crate::error::CaptureError;

/// How often the microphone buffer is drained
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Source of utterances
#[async_trait(?Send)]
pub trait SpeechInput {
    /// Capture one utterance
    ///
    /// Waits at most `listen_timeout` for speech to begin and records at most
    /// `phrase_limit` of it.
    ///
    /// # Errors
    ///
    /// Returns a [`CaptureError`] when no usable text was produced
    async fn capture_utterance(
        &mut self,
        listen_timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<String, CaptureError>;
}

/// Microphone capture with energy-based segmentation and remote transcription
pub struct MicrophoneInput {
    capture: AudioCapture,
    stt: SpeechToText,
    energy_threshold: f32,
    dynamic_threshold: bool,
    calibration: Duration,
}

impl MicrophoneInput {
    /// Open the microphone
    ///
    /// # Errors
    ///
    /// Returns error if the input device cannot be opened or started
    pub fn new(stt: SpeechToText, listen: &ListenConfig) -> crate::Result<Self> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;

        Ok(Self {
            capture,
            stt,
            energy_threshold: listen.energy_threshold,
            dynamic_threshold: listen.dynamic_threshold,
            calibration: listen.calibration,
        })
    }

    /// Sample room noise and derive this window's threshold
    async fn calibrate(&self) -> f32 {
        if !self.dynamic_threshold || self.calibration.is_zero() {
            return self.energy_threshold;
        }

        tokio::time::sleep(self.calibration).await;
        calibrate_threshold(self.energy_threshold, &self.capture.take_buffer())
    }

    /// Record until the segmenter yields a phrase or gives up
    async fn record_phrase(
        &self,
        threshold: f32,
        listen_timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Vec<f32>, CaptureError> {
        let mut segmenter =
            SpeechSegmenter::new(threshold, SAMPLE_RATE, listen_timeout, phrase_limit);

        loop {
            tokio::time::sleep(CHUNK_INTERVAL).await;

            match segmenter.push(&self.capture.take_buffer()) {
                SegmentEvent::Pending => {}
                SegmentEvent::Complete(samples) => return Ok(samples),
                SegmentEvent::TimedOut => return Err(CaptureError::NoSpeech),
            }
        }
    }
}

#[async_trait(?Send)]
impl SpeechInput for MicrophoneInput {
    async fn capture_utterance(
        &mut self,
        listen_timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<String, CaptureError> {
        // Drop anything heard while the assistant was talking
        self.capture.clear_buffer();

        let threshold = self.calibrate().await;
        tracing::info!("listening");

        let samples = self
            .record_phrase(threshold, listen_timeout, phrase_limit)
            .await?;

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
        let text = self.stt.transcribe(&wav).await?;

        normalize(&text).ok_or(CaptureError::Unintelligible)
    }
}

/// Typed utterances, one per line
pub struct TextInput<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> TextInput<R> {
    /// Read utterances from `reader`
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl TextInput<tokio::io::BufReader<tokio::io::Stdin>> {
    /// Read utterances from standard input
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait(?Send)]
impl<R: AsyncBufRead + Unpin> SpeechInput for TextInput<R> {
    async fn capture_utterance(
        &mut self,
        listen_timeout: Duration,
        _phrase_limit: Duration,
    ) -> Result<String, CaptureError> {
        let line = tokio::time::timeout(listen_timeout, self.lines.next_line())
            .await
            .map_err(|_| CaptureError::NoSpeech)?
            .map_err(|e| CaptureError::Service(e.into()))?;

        match line {
            Some(line) => normalize(&line).ok_or(CaptureError::NoSpeech),
            None => Err(CaptureError::Closed),
        }
    }
}

/// Lowercase and trim; `None` if nothing is left
fn normalize(text: &str) -> Option<String> {
    let text = text.trim().to_lowercase();
    (!text.is_empty()).then_some(text)
}
