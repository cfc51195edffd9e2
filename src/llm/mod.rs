//! LLM utility layer
//!
//! Every provider implements [`ChatModel`]. [`get_llm`] picks one from the
//! settings. Gemini and OpenRouter clients walk an ordered list of fallback
//! models when the preferred one is rate limited or unavailable.

pub mod fallback;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod openrouter;
pub mod prompt;

use crate::config::{LlmProvider, Settings, GROQ_BASE_URL};
use crate::error::{InsightsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use fallback::{run_with_fallback, ErrorClass, FallbackOutcome, FallbackPolicy, ProviderError};
pub use gemini::GeminiFallbackLlm;
pub use mock::MockLlm;
pub use openai::OpenAiCompatibleLlm;
pub use openrouter::OpenRouterLlm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Sampling parameters shared by all HTTP-backed models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl GenerationConfig {
    pub fn from_settings(settings: &Settings, temperature: Option<f64>) -> Self {
        Self {
            temperature: temperature.unwrap_or(settings.temperature),
            max_tokens: settings.max_tokens,
            timeout_secs: settings.request_timeout_secs,
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name (e.g. "openrouter", "gemini")
    fn name(&self) -> &'static str;

    /// Preferred model identifier
    fn model(&self) -> &str;

    /// Run a chat completion and return the assistant text.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InsightsError::Llm(format!("Failed to build HTTP client: {}", e)))
}

/// Build the chat model selected by `settings`.
///
/// `temperature` and `model` override the configured values for this
/// instance only.
pub fn get_llm(
    settings: &Settings,
    temperature: Option<f64>,
    model: Option<&str>,
) -> Result<Arc<dyn ChatModel>> {
    let config = GenerationConfig::from_settings(settings, temperature);

    let llm: Arc<dyn ChatModel> = match settings.llm_provider {
        LlmProvider::OpenAi => {
            let api_key = require_key(settings.openai_api_key.as_deref(), "OPENAI_API_KEY")?;
            let model = model.unwrap_or(&settings.openai_model).to_string();
            if settings.openai_base_url.contains("openrouter") {
                Arc::new(OpenRouterLlm::new(api_key, model, settings.openai_base_url.clone(), config)?)
            } else {
                Arc::new(OpenAiCompatibleLlm::new(
                    "openai",
                    api_key,
                    model,
                    settings.openai_base_url.clone(),
                    config,
                )?)
            }
        }
        LlmProvider::OpenRouter => {
            let api_key = require_key(settings.openai_api_key.as_deref(), "OPENAI_API_KEY")?;
            let model = model.unwrap_or(&settings.openai_model).to_string();
            Arc::new(OpenRouterLlm::new(api_key, model, settings.openai_base_url.clone(), config)?)
        }
        LlmProvider::Google => {
            let api_key = require_key(settings.google_api_key.as_deref(), "GOOGLE_API_KEY")?;
            let model = model.unwrap_or(&settings.gemini_model).to_string();
            Arc::new(GeminiFallbackLlm::new(api_key, model, config)?)
        }
        LlmProvider::Groq => {
            let api_key = require_key(settings.groq_api_key.as_deref(), "GROQ_API_KEY")?;
            let model = model.unwrap_or(&settings.groq_model).to_string();
            Arc::new(OpenAiCompatibleLlm::new(
                "groq",
                api_key,
                model,
                GROQ_BASE_URL.to_string(),
                config,
            )?)
        }
        LlmProvider::Mock => Arc::new(MockLlm::new()),
    };

    info!(
        "Using LLM provider {} (model: {}, temperature: {})",
        llm.name(),
        llm.model(),
        config.temperature
    );
    Ok(llm)
}

fn require_key(key: Option<&str>, env_name: &str) -> Result<String> {
    key.map(str::to_string).ok_or_else(|| {
        InsightsError::Config(format!(
            "{} not found. Set it in the environment or a .env file.",
            env_name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_with_openrouter_url_uses_openrouter_client() {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            ..Settings::default()
        };
        let llm = get_llm(&settings, None, None).unwrap();
        assert_eq!(llm.name(), "openrouter");
        assert_eq!(llm.model(), settings.openai_model);
    }

    #[test]
    fn test_openai_provider_with_plain_url() {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            ..Settings::default()
        };
        let llm = get_llm(&settings, Some(0.3), Some("gpt-4o-mini")).unwrap();
        assert_eq!(llm.name(), "openai");
        assert_eq!(llm.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_missing_keys_are_config_errors() {
        let google = Settings {
            llm_provider: LlmProvider::Google,
            ..Settings::default()
        };
        let err = get_llm(&google, None, None).err().unwrap();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));

        let groq = Settings {
            llm_provider: LlmProvider::Groq,
            ..Settings::default()
        };
        let err = get_llm(&groq, None, None).err().unwrap();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_groq_and_gemini_selection() {
        let groq = Settings {
            llm_provider: LlmProvider::Groq,
            groq_api_key: Some("gsk-test".to_string()),
            ..Settings::default()
        };
        assert_eq!(get_llm(&groq, None, None).unwrap().name(), "groq");

        let gemini = Settings {
            llm_provider: LlmProvider::Google,
            google_api_key: Some("g-test".to_string()),
            ..Settings::default()
        };
        let llm = get_llm(&gemini, None, None).unwrap();
        assert_eq!(llm.name(), "gemini");
        assert_eq!(llm.model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_mock_needs_no_key() {
        let settings = Settings {
            llm_provider: LlmProvider::Mock,
            ..Settings::default()
        };
        assert_eq!(get_llm(&settings, None, None).unwrap().name(), "mock");
    }
}
