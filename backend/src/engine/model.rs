use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;
use thiserror::Error;

use crate::engine::classes::Prediction;
use crate::engine::preprocess::{DecodedImage, INPUT_CHANNELS};

#[derive(Debug, Error)]
#[error("Model load error: {0}")]
pub struct ModelLoadError(pub String);

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference error: {0}")]
    Execution(String),
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
    #[error("Remote inference error: {0}")]
    Remote(String),
    #[error("Remote inference timed out after {0}s")]
    RemoteTimeout(u64),
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn predict(&self, image: &DecodedImage) -> Result<Prediction, InferenceError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug)]
pub struct LocalModel {
    session: Arc<Mutex<Session>>,
}

impl LocalModel {
    pub fn load(model_path: &str) -> Result<Self, ModelLoadError> {
        if !std::path::Path::new(model_path).exists() {
            return Err(ModelLoadError(format!("model not found: {}", model_path)));
        }

        let session = Session::builder()
            .map_err(|e| ModelLoadError(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelLoadError(format!("failed to set optimization level: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| ModelLoadError(format!("failed to load model: {e}")))?;

        log::info!("Model loaded from {}", model_path);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
        })
    }

    fn run_session(&self, image: &DecodedImage) -> Result<Vec<f32>, InferenceError> {
        let input = Array4::<f32>::from_shape_vec(
            (1, INPUT_CHANNELS, image.height as usize, image.width as usize),
            image.pixels.clone(),
        )
        .map_err(|e| InferenceError::Execution(format!("input shape error: {e}")))?;

        let input_tensor = Value::from_array(input)
            .map_err(|e| InferenceError::Execution(format!("tensor error: {e}")))?;

        let mut session = self.session.lock().unwrap();
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError::InvalidOutput("model defines no outputs".into()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Execution(format!("inference failed: {e}")))?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| InferenceError::InvalidOutput("missing output tensor".into()))?;
        let (_, logits) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::InvalidOutput(format!("extract error: {e}")))?;

        Ok(softmax(logits))
    }
}

#[async_trait]
impl InferenceBackend for LocalModel {
    async fn predict(&self, image: &DecodedImage) -> Result<Prediction, InferenceError> {
        let scores = self.run_session(image)?;
        Prediction::from_scores(&scores)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_fails_for_missing_weights() {
        let err = LocalModel::load("/nonexistent/crop_disease.onnx").unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn load_fails_for_corrupt_weights() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not an onnx graph").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        assert!(LocalModel::load(&path).is_err());
    }

    #[test]
    fn softmax_produces_a_probability_distribution() {
        let scores = softmax(&[2.0, 1.0, 0.5, -1.0]);
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scores.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(
            scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i),
            Some(0)
        );
    }
}
