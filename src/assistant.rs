//! The turn loop
//!
//! Greets, then repeatedly captures an utterance, lets the [`Conversation`]
//! decide on a reply and speaks it, until a stop word, the end of input, or
//! an external interrupt.

use std::future::Future;

use crate::config::{Config, ListenConfig};
use crate::conversation::Conversation;
use crate::emotion::EmotionClassifier;
use crate::error::CaptureError;
use crate::reply::{CompletionParams, FallbackReplies, GroqCompletion, ReplySource};
use crate::voice::{
    AudioPlayback, MicrophoneInput, SpeechInput, SpeechOutput, SpeechToText, TextInput,
    TextToSpeech, VoiceOutput,
};
use crate::Result;

/// Spoken once at startup
pub const GREETING: &str = "EMORA is ready. Say my name to begin.";

/// Why the run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A stop word ended the session and the farewell was spoken
    Farewell,
    /// The interrupt future resolved
    Interrupted,
    /// The input source ran dry
    InputClosed,
}

/// Voice assistant wired to its input and output
pub struct Assistant {
    conversation: Conversation,
    input: Box<dyn SpeechInput>,
    output: Box<dyn SpeechOutput>,
    listen: ListenConfig,
}

impl Assistant {
    /// Assemble an assistant from parts
    #[must_use]
    pub fn new(
        conversation: Conversation,
        input: Box<dyn SpeechInput>,
        output: Box<dyn SpeechOutput>,
        listen: ListenConfig,
    ) -> Self {
        Self {
            conversation,
            input,
            output,
            listen,
        }
    }

    /// Build the assistant described by `config`
    ///
    /// Missing credentials or audio devices degrade to fallback replies,
    /// typed input, or text-only output instead of failing.
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be constructed
    pub fn from_config(config: &Config, text_mode: bool) -> Result<Self> {
        let groq_key = config.api_keys.groq.as_deref();

        let replies = if let Some(key) = groq_key {
            let backend = GroqCompletion::new(key.to_string(), &config.llm)?;
            tracing::info!(model = %config.llm.model, "Groq connected");
            ReplySource::new(
                Some(Box::new(backend)),
                FallbackReplies::default(),
                CompletionParams::from(&config.llm),
            )
        } else {
            tracing::warn!("GROQ_API_KEY not set, running in fallback mode");
            ReplySource::offline(FallbackReplies::default())
        };

        let input = build_input(config, groq_key, text_mode)?;
        let output = build_output(config)?;

        let conversation = Conversation::new(
            config.session.clone(),
            EmotionClassifier::default(),
            replies,
        );

        Ok(Self::new(
            conversation,
            input,
            Box::new(output),
            config.listen.clone(),
        ))
    }

    /// Run until a farewell, the end of input, or `interrupt` resolves
    ///
    /// An interrupt abandons whatever capture or playback is in flight.
    pub async fn run(&mut self, interrupt: impl Future<Output = ()>) -> RunOutcome {
        tokio::select! {
            outcome = self.converse() => outcome,
            () = interrupt => {
                tracing::debug!("interrupt received");
                RunOutcome::Interrupted
            }
        }
    }

    async fn converse(&mut self) -> RunOutcome {
        self.say(GREETING).await;

        loop {
            let captured = self
                .input
                .capture_utterance(self.listen.timeout, self.listen.phrase_limit)
                .await;

            let utterance = match captured {
                Ok(utterance) => utterance,
                Err(CaptureError::Closed) => {
                    tracing::info!("input closed");
                    return RunOutcome::InputClosed;
                }
                Err(e @ CaptureError::Service(_)) => {
                    tracing::warn!(error = %e, "capture failed");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(reason = %e, "no utterance");
                    continue;
                }
            };

            tracing::info!("you said: {utterance}");

            let turn = self.conversation.handle(&utterance).await;

            if let Some(emotion) = turn.emotion {
                tracing::info!(%emotion, "detected emotion");
            }

            if let Some(reply) = &turn.reply {
                self.say(reply).await;
            }

            if turn.terminal {
                return RunOutcome::Farewell;
            }
        }
    }

    /// Speak `text`; output failures are logged and the loop carries on
    async fn say(&mut self, text: &str) {
        if text.trim().is_empty() {
            tracing::warn!("nothing to speak");
            return;
        }

        if let Err(e) = self.output.speak(text).await {
            tracing::error!(error = %e, "failed to speak reply");
        }
    }
}

fn build_input(
    config: &Config,
    groq_key: Option<&str>,
    text_mode: bool,
) -> Result<Box<dyn SpeechInput>> {
    let key = match groq_key {
        Some(key) if !text_mode => key,
        Some(_) => {
            tracing::info!("text input mode, type one utterance per line");
            return Ok(Box::new(TextInput::stdin()));
        }
        None => {
            tracing::warn!("speech recognition unavailable, type one utterance per line");
            return Ok(Box::new(TextInput::stdin()));
        }
    };

    let stt = SpeechToText::new(key.to_string(), &config.llm, &config.stt)?;

    match MicrophoneInput::new(stt, &config.listen) {
        Ok(microphone) => {
            tracing::info!(model = %config.stt.model, "microphone ready");
            Ok(Box::new(microphone))
        }
        Err(e) => {
            tracing::warn!(error = %e, "microphone unavailable, falling back to typed input");
            Ok(Box::new(TextInput::stdin()))
        }
    }
}

fn build_output(config: &Config) -> Result<VoiceOutput> {
    let Some(key) = config.api_keys.elevenlabs.as_deref() else {
        tracing::warn!("ELEVENLABS_API_KEY not set, text only mode");
        return Ok(VoiceOutput::text_only());
    };

    let tts = TextToSpeech::new(key.to_string(), &config.tts)?;

    match AudioPlayback::new() {
        Ok(playback) => {
            tracing::info!(voice = %config.tts.voice_id, "ElevenLabs ready");
            Ok(VoiceOutput::spoken(tts, playback))
        }
        Err(e) => {
            tracing::warn!(error = %e, "no speaker available, text only mode");
            Ok(VoiceOutput::text_only())
        }
    }
}
