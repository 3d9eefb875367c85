//! Answer validation hook owned by the survey configuration.

use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject(String),
}

pub trait SurveyGate: Send + Sync {
    fn check(&self, survey_id: &str, answers: &Value) -> GateDecision;
}

/// Accepts any non-empty JSON object of answers.
#[derive(Clone, Debug)]
pub struct OpenSurveyGate;

impl SurveyGate for OpenSurveyGate {
    fn check(&self, _survey_id: &str, answers: &Value) -> GateDecision {
        match answers.as_object() {
            Some(map) if !map.is_empty() => GateDecision::Accept,
            Some(_) => GateDecision::Reject("no answers given".to_string()),
            None => GateDecision::Reject("answers must be an object".to_string()),
        }
    }
}
