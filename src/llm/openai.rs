//! OpenAI-compatible chat completions client
//!
//! Used directly for OpenAI-style hosts and Groq, and as the wire layer
//! underneath the OpenRouter fallback client.

use crate::error::{InsightsError, Result};
use crate::llm::fallback::ProviderError;
use crate::llm::{http_client, ChatMessage, ChatModel, GenerationConfig};
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct OpenAiCompatibleLlm {
    provider: &'static str,
    api_key: String,
    model: String,
    base_url: String,
    config: GenerationConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleLlm {
    pub fn new(
        provider: &'static str,
        api_key: String,
        model: String,
        base_url: String,
        config: GenerationConfig,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleLlm {
    fn name(&self) -> &'static str {
        self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = chat_completion_body(&self.model, messages, &self.config);
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);

        send_chat_completion(request)
            .await
            .map_err(|e| InsightsError::Llm(format!("{} request failed: {}", self.provider, e)))
    }
}

/// Request body for `/chat/completions`.
pub fn chat_completion_body(
    model: &str,
    messages: &[ChatMessage],
    config: &GenerationConfig,
) -> serde_json::Value {
    let api_messages: Vec<serde_json::Value> = messages
        .iter()
        .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    let mut body = serde_json::json!({
        "model": model,
        "messages": api_messages,
        "temperature": config.temperature,
    });

    // Reasoning models take max_completion_tokens instead of max_tokens
    if model.starts_with("gpt-5") || model.starts_with("o1") {
        body["max_completion_tokens"] = serde_json::json!(config.max_tokens);
    } else {
        body["max_tokens"] = serde_json::json!(config.max_tokens);
    }

    body
}

/// Send a prepared request and pull the assistant text out of the reply.
pub async fn send_chat_completion(
    request: reqwest::RequestBuilder,
) -> std::result::Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::transport(format!("API call failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ProviderError::new(Some(status.as_u16()), error_text));
    }

    let response_json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| ProviderError::transport(format!("Failed to parse response: {}", e)))?;

    parse_chat_completion(&response_json)
}

pub fn parse_chat_completion(response_json: &serde_json::Value) -> std::result::Result<String, ProviderError> {
    if let Some(error) = response_json.get("error") {
        let status = error.get("code").and_then(|c| c.as_u64()).map(|c| c as u16);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ProviderError::new(status, message));
    }

    let choice = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| ProviderError::transport(format!("No choices in response: {}", response_json)))?;

    match choice.get("finish_reason").and_then(|r| r.as_str()) {
        Some("length") => warn!("LLM response was truncated due to length limit"),
        Some("content_filter") => {
            return Err(ProviderError::transport("LLM response was filtered by content policy"))
        }
        _ => {}
    }

    let content = choice["message"]["content"].as_str().unwrap_or("").trim();
    if content.is_empty() {
        debug!("Empty completion payload: {}", response_json);
        return Err(ProviderError::transport("Empty content in LLM response"));
    }

    Ok(content.to_string())
}
