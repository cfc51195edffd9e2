//! OpenRouter client with free-model fallback
//!
//! Free OpenRouter models are rate limited aggressively, so any failure on
//! one model moves on to the next entry of `OPENROUTER_FALLBACK_MODELS`.

use crate::error::Result;
use crate::llm::fallback::{model_chain, run_with_fallback, FallbackPolicy};
use crate::llm::openai::{chat_completion_body, send_chat_completion};
use crate::llm::{http_client, ChatMessage, ChatModel, GenerationConfig};
use async_trait::async_trait;

/// Free models to try, in order of preference.
pub const OPENROUTER_FALLBACK_MODELS: [&str; 5] = [
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.2-3b-instruct:free",
    "mistralai/mistral-7b-instruct:free",
    "huggingfaceh4/zephyr-7b-beta:free",
    "openchat/openchat-7b:free",
];

const REFERER: &str = "https://retail-insights.streamlit.app";
const APP_TITLE: &str = "Retail Insights Assistant";

pub struct OpenRouterLlm {
    api_key: String,
    model: String,
    base_url: String,
    config: GenerationConfig,
    client: reqwest::Client,
}

impl OpenRouterLlm {
    pub fn new(api_key: String, model: String, base_url: String, config: GenerationConfig) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            client: http_client(config.timeout_secs)?,
        })
    }

    /// Configured model first, then the free list.
    pub fn models_to_try(&self) -> Vec<String> {
        model_chain(&self.model, &OPENROUTER_FALLBACK_MODELS)
    }
}

#[async_trait]
impl ChatModel for OpenRouterLlm {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let outcome = run_with_fallback(&self.models_to_try(), FallbackPolicy::AnyError, |model| {
            send_chat_completion(self.request(&url, &model, messages))
        })
        .await?;

        Ok(outcome.content)
    }
}

impl OpenRouterLlm {
    fn request(&self, url: &str, model: &str, messages: &[ChatMessage]) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&chat_completion_body(model, messages, &self.config))
    }
}
