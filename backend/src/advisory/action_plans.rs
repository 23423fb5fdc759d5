use std::collections::HashMap;

use crate::advisory::config::AdvisoryConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ActionPlan {
    pub label: String,
    pub recommendation: String,
}

#[derive(Clone)]
pub struct ActionPlanResolver {
    plans: HashMap<String, String>,
    fallback: String,
}

impl ActionPlanResolver {
    pub fn from_config(config: &AdvisoryConfig) -> Self {
        let plans = config
            .plans
            .iter()
            .map(|(label, spec)| (label.clone(), spec.recommendation.clone()))
            .collect();
        Self {
            plans,
            fallback: config.fallback.recommendation.clone(),
        }
    }

    // A classification result always gets some actionable text back.
    pub fn resolve(&self, label: &str) -> ActionPlan {
        match self.plans.get(label) {
            Some(recommendation) => ActionPlan {
                label: label.to_string(),
                recommendation: recommendation.clone(),
            },
            None => {
                log::warn!("No action plan for label '{}', using fallback", label);
                ActionPlan {
                    label: label.to_string(),
                    recommendation: self.fallback.clone(),
                }
            }
        }
    }
}
