//! Speech segmentation
//!
//! Turns a stream of microphone chunks into one bounded phrase using RMS
//! energy. Waiting gives up after the listen timeout; a phrase ends on a
//! pause or when it hits the phrase limit. A wall-clock deadline of listen
//! timeout plus phrase limit bounds the window even if no audio arrives.

use std::time::{Duration, Instant};

use super::capture::calculate_rms;

/// Minimum duration of speech for a phrase to count
const MIN_SPEECH: Duration = Duration::from_millis(300);

/// Pause that ends a phrase
const PAUSE: Duration = Duration::from_millis(800);

/// Ambient energy is multiplied by this to get the dynamic threshold
const AMBIENT_MARGIN: f32 = 1.5;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// No speech yet
    Waiting,
    /// Speech started, accumulating the phrase
    Capturing,
}

/// Result of feeding a chunk
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Need more audio
    Pending,
    /// A phrase is ready
    Complete(Vec<f32>),
    /// No speech began within the listen timeout
    TimedOut,
}

/// Segments one phrase out of an audio stream
pub struct SpeechSegmenter {
    threshold: f32,
    listen_limit: usize,
    phrase_limit: usize,
    pause_samples: usize,
    min_speech_samples: usize,
    deadline: Instant,
    state: SegmenterState,
    buffer: Vec<f32>,
    waited: usize,
    speech_samples: usize,
    silence_counter: usize,
}

impl SpeechSegmenter {
    /// Create a segmenter for one listen window
    #[must_use]
    pub fn new(
        threshold: f32,
        sample_rate: u32,
        listen_timeout: Duration,
        phrase_limit: Duration,
    ) -> Self {
        let samples = |d: Duration| duration_to_samples(d, sample_rate);

        Self {
            threshold,
            listen_limit: samples(listen_timeout),
            phrase_limit: samples(phrase_limit).max(1),
            pause_samples: samples(PAUSE),
            min_speech_samples: samples(MIN_SPEECH),
            deadline: Instant::now() + listen_timeout + phrase_limit,
            state: SegmenterState::Waiting,
            buffer: Vec::new(),
            waited: 0,
            speech_samples: 0,
            silence_counter: 0,
        }
    }

    /// Feed a chunk of samples
    pub fn push(&mut self, samples: &[f32]) -> SegmentEvent {
        if samples.is_empty() {
            return self.check_deadline();
        }

        let energy = calculate_rms(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            SegmenterState::Waiting => {
                if is_speech {
                    tracing::trace!(energy, "speech started");
                    self.state = SegmenterState::Capturing;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.speech_samples = samples.len();
                    self.silence_counter = 0;
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.listen_limit {
                        return SegmentEvent::TimedOut;
                    }
                }
            }
            SegmenterState::Capturing => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.speech_samples += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.buffer.len() >= self.phrase_limit {
                    tracing::debug!(samples = self.phrase_limit, "phrase limit reached");
                    return self.finish();
                }

                if self.silence_counter > self.pause_samples {
                    if self.speech_samples >= self.min_speech_samples {
                        tracing::debug!(samples = self.buffer.len(), "phrase complete");
                        return self.finish();
                    }

                    // Too short to be speech; keep waiting
                    tracing::trace!("blip discarded");
                    self.waited += self.buffer.len();
                    self.reset_phrase();
                    if self.waited >= self.listen_limit {
                        return SegmentEvent::TimedOut;
                    }
                }
            }
        }

        SegmentEvent::Pending
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Energy threshold in use
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Give up once the window's wall-clock budget is spent
    ///
    /// Covers a stalled input stream that stops delivering samples.
    fn check_deadline(&mut self) -> SegmentEvent {
        if Instant::now() < self.deadline {
            return SegmentEvent::Pending;
        }

        if self.state == SegmenterState::Capturing
            && self.speech_samples >= self.min_speech_samples
        {
            tracing::warn!(samples = self.buffer.len(), "audio stalled, ending phrase");
            return self.finish();
        }

        tracing::warn!("no audio before the listen deadline");
        self.reset_phrase();
        SegmentEvent::TimedOut
    }

    fn finish(&mut self) -> SegmentEvent {
        let mut phrase = std::mem::take(&mut self.buffer);
        phrase.truncate(self.phrase_limit);
        self.reset_phrase();
        SegmentEvent::Complete(phrase)
    }

    fn reset_phrase(&mut self) {
        self.state = SegmenterState::Waiting;
        self.buffer.clear();
        self.speech_samples = 0;
        self.silence_counter = 0;
    }
}

/// Speech threshold after sampling room noise
///
/// Never drops below the configured base.
#[must_use]
pub fn calibrate_threshold(base: f32, ambient: &[f32]) -> f32 {
    let ambient_energy = calculate_rms(ambient);
    let threshold = base.max(ambient_energy * AMBIENT_MARGIN);
    tracing::debug!(ambient_energy, threshold, "calibrated energy threshold");
    threshold
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn duration_to_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;

    #[test]
    fn test_duration_to_samples() {
        assert_eq!(duration_to_samples(Duration::from_secs(1), RATE), 16000);
        assert_eq!(duration_to_samples(Duration::from_millis(500), RATE), 8000);
    }

    #[test]
    fn test_calibration_never_lowers_base() {
        assert!((calibrate_threshold(0.03, &[0.0; 1600]) - 0.03).abs() < f32::EPSILON);
        assert!((calibrate_threshold(0.03, &[0.1; 1600]) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_stalled_input_times_out() {
        let mut segmenter = SpeechSegmenter::new(
            0.03,
            RATE,
            Duration::from_millis(20),
            Duration::from_millis(20),
        );
        assert_eq!(segmenter.push(&[]), SegmentEvent::Pending);

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(segmenter.push(&[]), SegmentEvent::TimedOut);
    }

    #[test]
    fn test_stall_mid_phrase_keeps_speech() {
        let mut segmenter = SpeechSegmenter::new(
            0.03,
            RATE,
            Duration::from_millis(10),
            Duration::from_millis(400),
        );
        assert_eq!(segmenter.push(&[0.5; 5600]), SegmentEvent::Pending);
        assert_eq!(segmenter.state(), SegmenterState::Capturing);

        std::thread::sleep(Duration::from_millis(450));
        assert_eq!(segmenter.push(&[]), SegmentEvent::Complete(vec![0.5; 5600]));
        assert_eq!(segmenter.state(), SegmenterState::Waiting);
    }

    #[test]
    fn test_empty_chunk_is_pending() {
        let mut segmenter =
            SpeechSegmenter::new(0.03, RATE, Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(segmenter.push(&[]), SegmentEvent::Pending);
        assert_eq!(segmenter.state(), SegmenterState::Waiting);
    }
}
