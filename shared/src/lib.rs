use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiagnosisResponse {
    pub label: String,
    pub confidence: f32,
    pub severity: Severity,
    pub action_plan: String,
    pub audio_url: Option<String>,
    pub diagnosed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub message: String,
}
