use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const MAX_ATTEMPTS: u32 = 3;
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const MAX_BACKOFF: Duration = Duration::from_secs(4);

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("TTS request failed: {0}")]
    Transport(String),
    #[error("TTS request timed out")]
    Timeout,
    #[error("TTS provider returned {status}: {detail}")]
    Provider { status: StatusCode, detail: String },
    #[error("TTS failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl TtsError {
    pub fn is_transient(&self) -> bool {
        match self {
            TtsError::Transport(_) | TtsError::Timeout => true,
            TtsError::Provider { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            TtsError::RetriesExhausted { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub audio_url: String,
    pub language: String,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioArtifact, TtsError>;
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    input: &'a str,
    source_language: &'a str,
    target_language: &'a str,
}

#[derive(Deserialize)]
struct TtsResponse {
    audio_url: String,
}

#[derive(Clone)]
pub struct BhashiniService {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl BhashiniService {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client build never fails with valid TLS config");
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn request_once(&self, text: &str, language: &str) -> Result<AudioArtifact, TtsError> {
        let body = TtsRequest {
            input: text,
            source_language: "en",
            target_language: language,
        };

        let url = format!("{}/services/tts", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else {
                    TtsError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(TtsError::Provider { status, detail });
        }

        let parsed: TtsResponse = response
            .json()
            .await
            .map_err(|e| TtsError::Transport(format!("response parse failed: {e}")))?;

        Ok(AudioArtifact {
            audio_url: parsed.audio_url,
            language: language.to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for BhashiniService {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioArtifact, TtsError> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_error: Option<TtsError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.request_once(text, language).await {
                Ok(artifact) => return Ok(artifact),
                // Permanent failures are not worth retrying.
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    log::warn!("TTS attempt {}/{} failed: {}", attempt, MAX_ATTEMPTS, e);
                    last_error = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        Err(TtsError::RetriesExhausted {
            attempts: MAX_ATTEMPTS,
            last,
        })
    }
}
