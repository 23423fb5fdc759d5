use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::classes::DiseaseClass;

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    pub version: f32,
    pub fallback: PlanSpec,
    pub plans: HashMap<String, PlanSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanSpec {
    pub recommendation: String,
}

impl AdvisoryConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = match std::env::var("ACTION_PLANS_PATH") {
            Ok(path) => path,
            Err(_) => {
                let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
                    .map_err(|_| "Failed to get manifest directory")?;
                format!("{}/../config/action_plans.yaml", manifest_dir)
            }
        };
        let config_str = std::fs::read_to_string(config_path)?;
        let config: AdvisoryConfig = serde_yaml::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    // Every known class must have a usable plan before the service starts.
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.fallback.recommendation.trim().is_empty() {
            return Err("fallback recommendation is empty".into());
        }
        for class in DiseaseClass::ALL {
            let label = class.label();
            match self.plans.get(label) {
                Some(spec) if !spec.recommendation.trim().is_empty() => {}
                Some(_) => return Err(format!("empty recommendation for {label}").into()),
                None => return Err(format!("missing action plan for {label}").into()),
            }
        }
        Ok(())
    }
}
