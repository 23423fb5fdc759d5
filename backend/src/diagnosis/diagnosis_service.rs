use std::sync::Arc;

use chrono::Utc;
use shared::DiagnosisResponse;
use thiserror::Error;
use uuid::Uuid;

use crate::advisory::action_plans::ActionPlanResolver;
use crate::engine::model::{InferenceBackend, InferenceError};
use crate::engine::preprocess::{self, DecodeError};
use crate::speech::tts_service::{SpeechSynthesizer, TtsError};

#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] DecodeError),
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
    #[error("Speech synthesis error: {0}")]
    Speech(#[from] TtsError),
}

impl DiagnosisError {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosisError::InvalidImage(_) => "invalid_image",
            DiagnosisError::Inference(
                InferenceError::Remote(_) | InferenceError::RemoteTimeout(_),
            ) => "remote_inference_failed",
            DiagnosisError::Inference(_) => "inference_failed",
            DiagnosisError::Speech(_) => "tts_failed",
        }
    }
}

#[derive(Clone)]
pub struct DiagnosisService {
    backend: Arc<dyn InferenceBackend>,
    resolver: ActionPlanResolver,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio_required: bool,
    default_language: String,
}

impl DiagnosisService {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        resolver: ActionPlanResolver,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio_required: bool,
        default_language: String,
    ) -> Self {
        Self {
            backend,
            resolver,
            synthesizer,
            audio_required,
            default_language,
        }
    }

    pub async fn diagnose(
        &self,
        image_bytes: &[u8],
        language: Option<&str>,
    ) -> Result<DiagnosisResponse, DiagnosisError> {
        let request_id = Uuid::new_v4();
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_language);

        let decoded = preprocess::decode(image_bytes)?;
        let prediction = self.backend.predict(&decoded).await?;
        log::info!(
            "[{}] {} backend predicted '{}' at {:.3}",
            request_id,
            self.backend.name(),
            prediction.class.label(),
            prediction.confidence
        );

        let plan = self.resolver.resolve(prediction.class.label());

        let audio_url = match self
            .synthesizer
            .synthesize(&plan.recommendation, language)
            .await
        {
            Ok(artifact) => {
                log::info!(
                    "[{}] synthesized audio summary in '{}'",
                    request_id,
                    artifact.language
                );
                Some(artifact.audio_url)
            }
            Err(e) if !self.audio_required => {
                log::warn!(
                    "[{}] audio synthesis failed, returning response without audio: {}",
                    request_id,
                    e
                );
                None
            }
            Err(e) => return Err(DiagnosisError::Speech(e)),
        };

        Ok(DiagnosisResponse {
            label: prediction.class.label().to_string(),
            confidence: prediction.confidence,
            severity: prediction.severity,
            action_plan: plan.recommendation,
            audio_url,
            diagnosed_at: Utc::now(),
        })
    }
}
