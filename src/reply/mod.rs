//! Reply generation
//!
//! A [`ReplySource`] asks a remote completion backend first and falls back to
//! a canned, emotion-keyed reply whenever the backend is missing, errors,
//! times out, or returns nothing. It never fails.

mod groq;

pub use groq::GroqCompletion;

use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::Result;
use crate::config::{LlmConfig, SYSTEM_PROMPT};
use crate::emotion::Emotion;

/// Remote conversational completion endpoint
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete `user_query` under `system_prompt`
    ///
    /// # Errors
    ///
    /// Returns error on network, authentication, or malformed-response
    /// conditions
    async fn complete(
        &self,
        system_prompt: &str,
        user_query: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Sampling limits for one completion call
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Hard timeout on the whole call
    pub timeout: Duration,
}

impl From<&LlmConfig> for CompletionParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout,
        }
    }
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

/// Used only if a table row were somehow empty
const LAST_RESORT: &str = "I'm listening.";

const JOY_REPLIES: &[&str] = &["That sounds wonderful!", "I'm happy to hear that!"];
const SADNESS_REPLIES: &[&str] = &["I'm here for you.", "You're not alone."];
const CALM_REPLIES: &[&str] = &["How can I help you?", "I'm listening."];

/// Canned replies keyed by emotion
pub struct FallbackReplies {
    rng: StdRng,
}

impl FallbackReplies {
    /// Create with an explicit random source
    #[must_use]
    pub const fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Create with a fixed seed for reproducible picks
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Candidate replies for `emotion`
    #[must_use]
    pub const fn candidates(emotion: Emotion) -> &'static [&'static str] {
        match emotion {
            Emotion::Joy => JOY_REPLIES,
            Emotion::Sadness => SADNESS_REPLIES,
            Emotion::Calm => CALM_REPLIES,
        }
    }

    /// Pick one reply uniformly at random
    pub fn pick(&mut self, emotion: Emotion) -> &'static str {
        Self::candidates(emotion)
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(LAST_RESORT)
    }
}

impl Default for FallbackReplies {
    fn default() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

/// Produces a reply for every query
pub struct ReplySource {
    backend: Option<Box<dyn CompletionBackend>>,
    fallback: FallbackReplies,
    params: CompletionParams,
}

impl ReplySource {
    /// Create a reply source; `None` backend means fallback-only
    #[must_use]
    pub fn new(
        backend: Option<Box<dyn CompletionBackend>>,
        fallback: FallbackReplies,
        params: CompletionParams,
    ) -> Self {
        Self {
            backend,
            fallback,
            params,
        }
    }

    /// Fallback-only reply source
    #[must_use]
    pub fn offline(fallback: FallbackReplies) -> Self {
        Self::new(None, fallback, CompletionParams::default())
    }

    /// Whether a remote backend is configured
    #[must_use]
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Reply to `query`, falling back to a canned reply for `emotion`
    ///
    /// Makes at most one remote attempt and never fails.
    pub async fn get_reply(&mut self, query: &str, emotion: Emotion) -> String {
        let Some(backend) = &self.backend else {
            return self.fallback_reply(emotion);
        };

        let name = backend.name();
        let call = backend.complete(
            SYSTEM_PROMPT,
            query,
            self.params.max_tokens,
            self.params.temperature,
        );
        let outcome = tokio::time::timeout(self.params.timeout, call).await;

        match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => {
                tracing::warn!(backend = name, "empty completion, using fallback");
                self.fallback_reply(emotion)
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = name, error = %e, "completion failed, using fallback");
                self.fallback_reply(emotion)
            }
            Err(_) => {
                tracing::warn!(
                    backend = name,
                    timeout_ms = self.params.timeout.as_millis(),
                    "completion timed out, using fallback"
                );
                self.fallback_reply(emotion)
            }
        }
    }

    fn fallback_reply(&mut self, emotion: Emotion) -> String {
        let reply = self.fallback.pick(emotion);
        tracing::debug!(%emotion, reply, "fallback reply");
        reply.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Error;

    /// Backend that always fails
    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn complete(&self, _: &str, _: &str, _: u32, _: f32) -> Result<String> {
            Err(Error::Completion("service unavailable".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    /// Backend that echoes a fixed reply and records what it was asked
    struct RecordingBackend {
        reply: String,
        calls: Mutex<Vec<(String, String, u32)>>,
    }

    #[async_trait]
    impl CompletionBackend for RecordingBackend {
        async fn complete(
            &self,
            system_prompt: &str,
            user_query: &str,
            max_tokens: u32,
            _temperature: f32,
        ) -> Result<String> {
            self.calls.lock().unwrap().push((
                system_prompt.to_string(),
                user_query.to_string(),
                max_tokens,
            ));
            Ok(self.reply.clone())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    /// Backend that never answers in time
    struct SlowBackend;

    #[async_trait]
    impl CompletionBackend for SlowBackend {
        async fn complete(&self, _: &str, _: &str, _: u32, _: f32) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[test]
    fn test_every_emotion_has_two_candidates() {
        for emotion in Emotion::ALL {
            let candidates = FallbackReplies::candidates(emotion);
            assert!(candidates.len() >= 2);
            assert!(candidates.iter().all(|c| !c.is_empty()));
        }
    }

    #[test]
    fn test_seeded_picks_are_reproducible() {
        let mut a = FallbackReplies::seeded(42);
        let mut b = FallbackReplies::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.pick(Emotion::Joy), b.pick(Emotion::Joy));
        }
    }

    #[test]
    fn test_pick_stays_within_emotion() {
        let mut fallback = FallbackReplies::seeded(7);
        for emotion in Emotion::ALL {
            let reply = fallback.pick(emotion);
            assert!(FallbackReplies::candidates(emotion).contains(&reply));
        }
    }

    #[tokio::test]
    async fn test_offline_source_uses_fallback() {
        let mut source = ReplySource::offline(FallbackReplies::seeded(1));
        assert!(!source.has_backend());

        let reply = source.get_reply("hello", Emotion::Sadness).await;
        assert!(FallbackReplies::candidates(Emotion::Sadness).contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn test_failing_backend_never_raises() {
        let mut source = ReplySource::new(
            Some(Box::new(FailingBackend)),
            FallbackReplies::seeded(3),
            CompletionParams::default(),
        );

        for emotion in Emotion::ALL {
            let reply = source.get_reply("anything", emotion).await;
            assert!(!reply.is_empty());
            assert!(FallbackReplies::candidates(emotion).contains(&reply.as_str()));
        }
    }

    #[tokio::test]
    async fn test_backend_reply_is_trimmed() {
        let backend = RecordingBackend {
            reply: "  It's sunny.\n".to_string(),
            calls: Mutex::new(Vec::new()),
        };
        let mut source = ReplySource::new(
            Some(Box::new(backend)),
            FallbackReplies::seeded(3),
            CompletionParams::default(),
        );

        let reply = source.get_reply("what is the weather", Emotion::Calm).await;
        assert_eq!(reply, "It's sunny.");
    }

    #[tokio::test]
    async fn test_backend_receives_persona_and_limits() {
        let backend = std::sync::Arc::new(RecordingBackend {
            reply: "ok".to_string(),
            calls: Mutex::new(Vec::new()),
        });

        struct Shared(std::sync::Arc<RecordingBackend>);

        #[async_trait]
        impl CompletionBackend for Shared {
            async fn complete(&self, s: &str, q: &str, m: u32, t: f32) -> Result<String> {
                self.0.complete(s, q, m, t).await
            }

            fn name(&self) -> &'static str {
                "shared"
            }
        }

        let mut source = ReplySource::new(
            Some(Box::new(Shared(std::sync::Arc::clone(&backend)))),
            FallbackReplies::seeded(3),
            CompletionParams::default(),
        );
        source.get_reply("tell me a joke", Emotion::Calm).await;

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, SYSTEM_PROMPT);
        assert_eq!(calls[0].1, "tell me a joke");
        assert_eq!(calls[0].2, 200);
    }

    #[tokio::test]
    async fn test_blank_completion_falls_back() {
        let backend = RecordingBackend {
            reply: "   ".to_string(),
            calls: Mutex::new(Vec::new()),
        };
        let mut source = ReplySource::new(
            Some(Box::new(backend)),
            FallbackReplies::seeded(3),
            CompletionParams::default(),
        );

        let reply = source.get_reply("hmm", Emotion::Joy).await;
        assert!(FallbackReplies::candidates(Emotion::Joy).contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let params = CompletionParams {
            timeout: Duration::from_millis(50),
            ..CompletionParams::default()
        };
        let mut source =
            ReplySource::new(Some(Box::new(SlowBackend)), FallbackReplies::seeded(5), params);

        let reply = source.get_reply("are you there", Emotion::Calm).await;
        assert_ne!(reply, "too late");
        assert!(FallbackReplies::candidates(Emotion::Calm).contains(&reply.as_str()));
    }
}
