//! Ordered model fallback
//!
//! A fallback chain tries each model in order until one answers. The
//! policy decides which failures are allowed to advance the chain.

use crate::error::{InsightsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::{info, warn};

/// Failure reported by a single provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn classify(&self) -> ErrorClass {
        let lower = self.message.to_lowercase();
        if lower.contains("quota") {
            return ErrorClass::QuotaExceeded;
        }
        if self.status == Some(429)
            || lower.contains("rate limit")
            || lower.contains("rate-limit")
            || lower.contains("rate_limit")
            || lower.contains("resource_exhausted")
            || lower.contains("too many requests")
        {
            return ErrorClass::RateLimited;
        }
        if self.status == Some(404) || lower.contains("not found") || lower.contains("not_found") {
            return ErrorClass::ModelNotFound;
        }
        ErrorClass::Other
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    RateLimited,
    QuotaExceeded,
    ModelNotFound,
    Other,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorClass::Other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Any failure moves on to the next model.
    AnyError,
    /// Only rate-limit, quota and missing-model failures move on.
    RetryableOnly,
}

impl FallbackPolicy {
    fn should_fallback(self, class: ErrorClass) -> bool {
        match self {
            FallbackPolicy::AnyError => true,
            FallbackPolicy::RetryableOnly => class.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub model: String,
    pub class: ErrorClass,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackOutcome {
    /// Model that produced `content`
    pub model: String,
    pub content: String,
    /// Failures before the successful call
    pub attempts: Vec<FailedAttempt>,
}

impl FallbackOutcome {
    pub fn used_fallback(&self) -> bool {
        !self.attempts.is_empty()
    }
}

/// `primary` followed by every fallback that differs from it, without repeats.
pub fn model_chain(primary: &str, fallbacks: &[&str]) -> Vec<String> {
    let mut chain = vec![primary.to_string()];
    for model in fallbacks {
        if !chain.iter().any(|m| m == model) {
            chain.push(model.to_string());
        }
    }
    chain
}

/// Call `call` with each model in order until one succeeds.
pub async fn run_with_fallback<F, Fut>(
    models: &[String],
    policy: FallbackPolicy,
    mut call: F,
) -> Result<FallbackOutcome>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = std::result::Result<String, ProviderError>>,
{
    if models.is_empty() {
        return Err(InsightsError::Llm("No models configured".to_string()));
    }

    let mut attempts: Vec<FailedAttempt> = Vec::new();

    for model in models {
        match call(model.clone()).await {
            Ok(content) => {
                if !attempts.is_empty() {
                    info!("Used fallback model: {}", model);
                }
                return Ok(FallbackOutcome {
                    model: model.clone(),
                    content,
                    attempts,
                });
            }
            Err(err) => {
                let class = err.classify();
                if !policy.should_fallback(class) {
                    return Err(InsightsError::Llm(format!("{} failed: {}", model, err)));
                }
                warn!("{} unavailable ({:?}): {}, trying next model", model, class, err);
                attempts.push(FailedAttempt {
                    model: model.clone(),
                    class,
                    message: err.to_string(),
                });
            }
        }
    }

    let last_error = attempts
        .last()
        .map(|a| format!("{} ({})", a.message, a.model))
        .unwrap_or_default();
    Err(InsightsError::Llm(format!("All models failed. Last error: {}", last_error)))
}
