use crate::agents::{Agent, AgentState};
use crate::error::Result;
use crate::profile::FrameProfile;
use crate::validation::{validate_profile, ConfidenceScorer, ConfidenceScores, ValidationResult, ValidationRules};
use async_trait::async_trait;
use polars::prelude::DataFrame;
use tracing::{error, info, warn};

/// Checks the extracted result and scores how far it can be trusted.
#[derive(Debug, Default)]
pub struct ValidationAgent {
    rules: ValidationRules,
    scorer: ConfidenceScorer,
}

impl ValidationAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: ValidationRules) -> Self {
        Self {
            rules,
            scorer: ConfidenceScorer::new(),
        }
    }

    pub fn evaluate(&self, df: &DataFrame) -> Result<(ValidationResult, ConfidenceScores)> {
        let profile = FrameProfile::from_frame(df)?;
        Ok((validate_profile(&profile, &self.rules), self.scorer.score(&profile)))
    }

    fn fail(state: &mut AgentState, error: Option<String>) {
        state.validation_passed = false;
        state.confidence_scores = Some(ConfidenceScores::zero());
        if error.is_some() {
            state.error = error;
        }
    }
}

#[async_trait]
impl Agent for ValidationAgent {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn run(&self, state: &mut AgentState) {
        // An earlier stage already failed; keep its message.
        if state.error.is_some() {
            Self::fail(state, None);
            return;
        }

        if state.query_result.is_none() {
            Self::fail(state, Some("No query result to validate".to_string()));
            return;
        }

        let Some(df) = state.query_result.as_ref().and_then(|r| r.data.as_ref()) else {
            Self::fail(state, Some("No dataframe in query result".to_string()));
            return;
        };
        let (rows, cols) = (df.height(), df.width());

        let (verdict, scores) = match self.evaluate(df) {
            Ok(outcome) => outcome,
            Err(e) => {
                let msg = format!("Validation error: {}", e);
                error!("{}", msg);
                Self::fail(state, Some(msg));
                return;
            }
        };

        state.confidence_scores = Some(scores);
        state.validation_warnings = verdict.warnings.clone();

        if !verdict.passed {
            let msg = format!("Validation failed: {}", verdict.issues.join("; "));
            error!("{}", msg);
            state.validation_passed = false;
            state.error = Some(msg);
            return;
        }

        for warning in &verdict.warnings {
            warn!("Validation warning: {}", warning);
        }
        info!(
            "Validation passed: {} rows, {} columns, confidence: {:.1}%",
            rows,
            cols,
            scores.overall * 100.0
        );
        state.validation_passed = true;
        state.error = None;
    }
}
