//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use emora::config::SessionConfig;
use emora::reply::{CompletionBackend, CompletionParams, FallbackReplies, ReplySource};
use emora::voice::{SpeechInput, SpeechOutput};
use emora::{CaptureError, Conversation, EmotionClassifier, Error, Result};

/// Replays a fixed list of capture results, then reports the input closed
pub struct ScriptedInput {
    script: VecDeque<std::result::Result<String, CaptureError>>,
    windows: Arc<Mutex<Vec<(Duration, Duration)>>>,
}

impl ScriptedInput {
    /// Successful captures only
    pub fn lines(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|l| Ok((*l).to_string())).collect())
    }

    pub fn new(script: Vec<std::result::Result<String, CaptureError>>) -> Self {
        Self {
            script: script.into(),
            windows: Arc::default(),
        }
    }

    /// Listen windows requested so far
    pub fn windows(&self) -> Arc<Mutex<Vec<(Duration, Duration)>>> {
        Arc::clone(&self.windows)
    }
}

#[async_trait(?Send)]
impl SpeechInput for ScriptedInput {
    async fn capture_utterance(
        &mut self,
        listen_timeout: Duration,
        phrase_limit: Duration,
    ) -> std::result::Result<String, CaptureError> {
        self.windows
            .lock()
            .unwrap()
            .push((listen_timeout, phrase_limit));
        self.script.pop_front().unwrap_or(Err(CaptureError::Closed))
    }
}

/// Never produces an utterance
pub struct SilentInput;

#[async_trait(?Send)]
impl SpeechInput for SilentInput {
    async fn capture_utterance(
        &mut self,
        _listen_timeout: Duration,
        _phrase_limit: Duration,
    ) -> std::result::Result<String, CaptureError> {
        std::future::pending().await
    }
}

/// Records everything spoken
#[derive(Clone, Default)]
pub struct RecordingOutput {
    spoken: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingOutput {
    /// Output whose synthesis always fails after recording the text
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl SpeechOutput for RecordingOutput {
    async fn speak(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("synthesis unavailable".to_string()));
        }
        Ok(())
    }
}

/// Completion backend that answers every query with the same text
#[derive(Clone)]
pub struct RecordingCompletion {
    reply: Option<String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl RecordingCompletion {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            queries: Arc::default(),
        }
    }

    /// Backend that errors on every call
    pub fn failing() -> Self {
        Self {
            reply: None,
            queries: Arc::default(),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for RecordingCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_query: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String> {
        self.queries.lock().unwrap().push(user_query.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Completion("service unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Conversation backed by `backend`, with deterministic fallbacks
pub fn conversation_with(backend: RecordingCompletion, session: SessionConfig) -> Conversation {
    let replies = ReplySource::new(
        Some(Box::new(backend)),
        FallbackReplies::seeded(7),
        CompletionParams::default(),
    );
    Conversation::new(session, EmotionClassifier::default(), replies)
}

/// Conversation with no completion backend
pub fn offline_conversation(session: SessionConfig) -> Conversation {
    Conversation::new(
        session,
        EmotionClassifier::default(),
        ReplySource::offline(FallbackReplies::seeded(7)),
    )
}
