//! Text-to-speech (TTS) processing

use std::time::Duration;

use crate::config::TtsConfig;
use crate::{Error, Result};

const ELEVENLABS_API: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// Synthesizes speech from text with `ElevenLabs`
pub struct TextToSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    voice_id: String,
    model: String,
    output_format: String,
    timeout: Duration,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the HTTP client cannot be built
    pub fn new(api_key: String, config: &TtsConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: ELEVENLABS_API.to_string(),
            api_key,
            timeout: config.timeout,
            voice_id: config.voice_id.clone(),
            model: config.model.clone(),
            output_format: config.output_format.clone(),
        })
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes in the configured output format (MP3 by default)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("output_format", self.output_format.as_str())])
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }

    /// Upper bound on one synthesis request
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.voice_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_key() {
        assert!(TextToSpeech::new(String::new(), &TtsConfig::default()).is_err());
    }

    #[test]
    fn test_client_is_time_bounded() {
        let config = TtsConfig {
            timeout: Duration::from_secs(3),
            ..TtsConfig::default()
        };
        let tts = TextToSpeech::new("key".to_string(), &config).unwrap();
        assert_eq!(tts.timeout(), Duration::from_secs(3));
        assert_eq!(TtsConfig::default().timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_unresponsive_server_fails_synthesis() {
        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let config = TtsConfig {
            timeout: Duration::from_millis(200),
            ..TtsConfig::default()
        };
        let mut tts = TextToSpeech::new("key".to_string(), &config).unwrap();
        tts.base_url = format!("http://{addr}");

        let started = std::time::Instant::now();
        let result = tts.synthesize("hello").await;
        assert!(matches!(result, Err(Error::Http(e)) if e.is_timeout()));
        assert!(started.elapsed() < Duration::from_secs(5));

        server.abort();
    }

    #[test]
    fn test_endpoint_uses_voice() {
        let tts = TextToSpeech::new("key".to_string(), &TtsConfig::default()).unwrap();
        assert_eq!(
            tts.endpoint(),
            "https://api.elevenlabs.io/v1/text-to-speech/JBFqnCBsd6RMkjVDRZzb"
        );
    }
}
