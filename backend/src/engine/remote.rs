use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::engine::classes::Prediction;
use crate::engine::model::{InferenceBackend, InferenceError};
use crate::engine::preprocess::{DecodedImage, INPUT_CHANNELS};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Serialize)]
struct ScoreRequest {
    tensor: String,
    shape: [usize; 4],
}

// The scorer returns probabilities in class index order, already softmaxed.
#[derive(Deserialize)]
struct ScoreResponse {
    scores: Vec<f32>,
}

pub struct RemoteModelService {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl RemoteModelService {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("reqwest client build never fails with valid TLS config");
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }

    fn encode_tensor(image: &DecodedImage) -> String {
        let mut raw = Vec::with_capacity(image.pixels.len() * 4);
        for value in &image.pixels {
            raw.extend_from_slice(&value.to_le_bytes());
        }
        general_purpose::STANDARD.encode(raw)
    }
}

#[async_trait]
impl InferenceBackend for RemoteModelService {
    async fn predict(&self, image: &DecodedImage) -> Result<Prediction, InferenceError> {
        let body = ScoreRequest {
            tensor: Self::encode_tensor(image),
            shape: [1, INPUT_CHANNELS, image.height as usize, image.width as usize],
        };

        let url = format!("{}/predict", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::RemoteTimeout(self.timeout_secs)
                } else {
                    InferenceError::Remote(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Remote(format!(
                "scorer returned {status}: {text}"
            )));
        }

        let parsed: ScoreResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Remote(format!("response parse failed: {e}")))?;

        Prediction::from_scores(&parsed.scores)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::preprocess::{INPUT_HEIGHT, INPUT_WIDTH};

    #[test]
    fn encode_tensor_round_trips_little_endian_floats() {
        let image = DecodedImage {
            pixels: vec![0.5, -1.25, 3.0],
            width: INPUT_WIDTH,
            height: INPUT_HEIGHT,
        };

        let encoded = RemoteModelService::encode_tensor(&image);
        let raw = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(raw.len(), 12);

        let restored: Vec<f32> = raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(restored, image.pixels);
    }

    #[test]
    fn score_request_serializes_tensor_and_shape() {
        let body = ScoreRequest {
            tensor: "AAAA".into(),
            shape: [1, 3, 224, 224],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["tensor"], "AAAA");
        assert_eq!(value["shape"][3], 224);
    }

    #[test]
    fn trailing_slash_is_stripped_from_endpoint() {
        let service = RemoteModelService::new("http://scorer.local/", DEFAULT_TIMEOUT_SECS);
        assert_eq!(service.endpoint, "http://scorer.local");
    }
}
