use serde::{Deserialize, Serialize};
use shared::Severity;

use crate::engine::model::InferenceError;

pub const CLASS_COUNT: usize = 7;

// Index order must match the training label order baked into the model
// weights and the remote scorer contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseClass {
    LateBlight,
    EarlyBlight,
    YellowRust,
    BrownRust,
    PowderyMildew,
    LeafSpot,
    Healthy,
}

impl DiseaseClass {
    pub const ALL: [DiseaseClass; CLASS_COUNT] = [
        DiseaseClass::LateBlight,
        DiseaseClass::EarlyBlight,
        DiseaseClass::YellowRust,
        DiseaseClass::BrownRust,
        DiseaseClass::PowderyMildew,
        DiseaseClass::LeafSpot,
        DiseaseClass::Healthy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DiseaseClass::LateBlight => "Late Blight",
            DiseaseClass::EarlyBlight => "Early Blight",
            DiseaseClass::YellowRust => "Yellow Rust",
            DiseaseClass::BrownRust => "Brown Rust",
            DiseaseClass::PowderyMildew => "Powdery Mildew",
            DiseaseClass::LeafSpot => "Leaf Spot",
            DiseaseClass::Healthy => "Healthy",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiseaseClass::LateBlight | DiseaseClass::YellowRust => Severity::High,
            DiseaseClass::EarlyBlight
            | DiseaseClass::BrownRust
            | DiseaseClass::PowderyMildew => Severity::Medium,
            DiseaseClass::LeafSpot | DiseaseClass::Healthy => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class: DiseaseClass,
    pub confidence: f32,
    pub severity: Severity,
}

impl Prediction {
    pub fn from_scores(scores: &[f32]) -> Result<Self, InferenceError> {
        if scores.len() != CLASS_COUNT {
            return Err(InferenceError::InvalidOutput(format!(
                "expected {} class scores, got {}",
                CLASS_COUNT,
                scores.len()
            )));
        }

        let mut best = 0;
        for (index, score) in scores.iter().enumerate() {
            if !score.is_finite() {
                return Err(InferenceError::InvalidOutput(format!(
                    "non-finite score at index {}",
                    index
                )));
            }
            if *score > scores[best] {
                best = index;
            }
        }

        let class = DiseaseClass::ALL[best];
        Ok(Prediction {
            class,
            confidence: scores[best].clamp(0.0, 1.0),
            severity: class.severity(),
        })
    }
}
