//! Application settings
//!
//! Settings come from the process environment. Binaries call
//! `dotenv::dotenv()` before `Settings::from_env()` so a local `.env`
//! file is honoured.

use crate::error::{InsightsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_OPENAI_MODEL: &str = "meta-llama/llama-3.2-3b-instruct:free";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Google,
    OpenRouter,
    Groq,
    Mock,
}

impl FromStr for LlmProvider {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "google" | "gemini" => Ok(LlmProvider::Google),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            "groq" => Ok(LlmProvider::Groq),
            "mock" => Ok(LlmProvider::Mock),
            other => Err(InsightsError::Config(format!("Unsupported LLM provider: {}", other))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Google => "google",
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::Groq => "groq",
            LlmProvider::Mock => "mock",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // LLM configuration
    pub llm_provider: LlmProvider,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    #[serde(skip_serializing)]
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    #[serde(skip_serializing)]
    pub groq_api_key: Option<String>,
    pub groq_model: String,

    // Data
    pub data_path: PathBuf,
    pub table_name: String,

    // Generation limits
    pub max_context_length: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,

    // Logging
    pub enable_logging: bool,
    pub log_level: String,
    pub query_log_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::OpenAi,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            google_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            groq_api_key: None,
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            data_path: PathBuf::from("./data/sales_data.csv"),
            table_name: "sales".to_string(),
            max_context_length: 4000,
            temperature: 0.1,
            max_tokens: 2000,
            request_timeout_secs: 60,
            enable_logging: true,
            log_level: "info".to_string(),
            query_log_path: None,
        }
    }
}

impl Settings {
    /// Build settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        let llm_provider = match get_secret("LLM_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => defaults.llm_provider,
        };

        Ok(Self {
            llm_provider,
            openai_api_key: get_secret("OPENAI_API_KEY"),
            openai_model: get_secret_or("OPENAI_MODEL", &defaults.openai_model),
            openai_base_url: get_secret_or("OPENAI_BASE_URL", &defaults.openai_base_url),
            google_api_key: get_secret("GOOGLE_API_KEY"),
            gemini_model: get_secret_or("GEMINI_MODEL", &defaults.gemini_model),
            groq_api_key: get_secret("GROQ_API_KEY"),
            groq_model: get_secret_or("GROQ_MODEL", &defaults.groq_model),
            data_path: get_secret("DATA_PATH").map(PathBuf::from).unwrap_or(defaults.data_path),
            table_name: get_secret_or("TABLE_NAME", &defaults.table_name),
            max_context_length: parse_env("MAX_CONTEXT_LENGTH", defaults.max_context_length)?,
            temperature: parse_env("TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_env("MAX_TOKENS", defaults.max_tokens)?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            enable_logging: get_secret("ENABLE_LOGGING")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.enable_logging),
            log_level: get_secret_or("LOG_LEVEL", &defaults.log_level).to_lowercase(),
            query_log_path: get_secret("QUERY_LOG_PATH").map(PathBuf::from),
        })
    }
}

/// Look up a secret in the environment. Empty values count as unset.
pub fn get_secret(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn get_secret_or(key: &str, default: &str) -> String {
    get_secret(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match get_secret(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| InsightsError::Config(format!("Invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!("gemini".parse::<LlmProvider>().unwrap(), LlmProvider::Google);
        assert_eq!(" groq ".parse::<LlmProvider>().unwrap(), LlmProvider::Groq);
        assert_eq!("mock".parse::<LlmProvider>().unwrap(), LlmProvider::Mock);

        let err = "anthropic".parse::<LlmProvider>().unwrap_err();
        assert!(err.to_string().contains("Unsupported LLM provider: anthropic"));
    }

    #[test]
    fn test_empty_secret_is_missing() {
        std::env::set_var("RETAIL_INSIGHTS_TEST_EMPTY_SECRET", "   ");
        assert_eq!(get_secret("RETAIL_INSIGHTS_TEST_EMPTY_SECRET"), None);
        assert_eq!(get_secret_or("RETAIL_INSIGHTS_TEST_EMPTY_SECRET", "fallback"), "fallback");
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("RETAIL_INSIGHTS_TEST_BAD_NUMBER", "lots");
        let err = parse_env::<usize>("RETAIL_INSIGHTS_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(err.to_string().contains("RETAIL_INSIGHTS_TEST_BAD_NUMBER"));

        std::env::set_var("RETAIL_INSIGHTS_TEST_GOOD_NUMBER", "42");
        assert_eq!(parse_env::<usize>("RETAIL_INSIGHTS_TEST_GOOD_NUMBER", 1).unwrap(), 42);
    }
}
