//! Gemini client with model fallback
//!
//! Only rate-limit, quota and model-not-found failures fall through to the
//! next model; anything else (bad key, malformed request) fails at once.

use crate::error::Result;
use crate::llm::fallback::{model_chain, run_with_fallback, FallbackPolicy, ProviderError};
use crate::llm::{http_client, ChatMessage, ChatModel, GenerationConfig, Role};
use async_trait::async_trait;
use tracing::warn;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const GEMINI_FALLBACK_MODELS: [&str; 4] = [
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
    "gemini-1.5-pro",
];

pub struct GeminiFallbackLlm {
    api_key: String,
    model: String,
    base_url: String,
    config: GenerationConfig,
    client: reqwest::Client,
}

impl GeminiFallbackLlm {
    pub fn new(api_key: String, model: String, config: GenerationConfig) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
            config,
            client: http_client(config.timeout_secs)?,
        })
    }

    pub fn models_to_try(&self) -> Vec<String> {
        model_chain(&self.model, &GEMINI_FALLBACK_MODELS)
    }

    async fn generate(&self, model: String, body: serde_json::Value) -> std::result::Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("Gemini API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::new(Some(status.as_u16()), error_text));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(format!("Failed to parse Gemini response: {}", e)))?;

        parse_generate_content(&response_json)
    }
}

#[async_trait]
impl ChatModel for GeminiFallbackLlm {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = generate_content_body(messages, &self.config);
        let outcome = run_with_fallback(&self.models_to_try(), FallbackPolicy::RetryableOnly, |model| {
            self.generate(model, body.clone())
        })
        .await?;

        if outcome.used_fallback() {
            warn!(
                "Gemini model {} unavailable, answered by {}",
                self.model, outcome.model
            );
        }
        Ok(outcome.content)
    }
}

/// System messages become `systemInstruction`; assistant turns use role `model`.
pub fn generate_content_body(messages: &[ChatMessage], config: &GenerationConfig) -> serde_json::Value {
    let system_text: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let contents: Vec<serde_json::Value> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = if m.role == Role::Assistant { "model" } else { "user" };
            serde_json::json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let mut body = serde_json::json!({
        "contents": contents,
        "generationConfig": {
            "temperature": config.temperature,
            "maxOutputTokens": config.max_tokens,
        },
    });

    if !system_text.is_empty() {
        body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": system_text.join("\n\n") }] });
    }

    body
}

pub fn parse_generate_content(response_json: &serde_json::Value) -> std::result::Result<String, ProviderError> {
    if let Some(error) = response_json.get("error") {
        let status = error.get("code").and_then(|c| c.as_u64()).map(|c| c as u16);
        let message = format!(
            "{} {}",
            error.get("status").and_then(|s| s.as_str()).unwrap_or(""),
            error.get("message").and_then(|s| s.as_str()).unwrap_or("")
        );
        return Err(ProviderError::new(status, message.trim().to_string()));
    }

    let candidate = response_json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = response_json["promptFeedback"]["blockReason"].as_str().unwrap_or("no candidates");
            ProviderError::transport(format!("Gemini returned no candidates: {}", reason))
        })?;

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
        return Err(ProviderError::transport(format!("Empty Gemini response (finish reason: {})", reason)));
    }

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fallback::ErrorClass;

    #[test]
    fn test_body_maps_roles() {
        let config = GenerationConfig { temperature: 0.3, max_tokens: 256, timeout_secs: 10 };
        let body = generate_content_body(
            &[
                ChatMessage::system("You are an analyst."),
                ChatMessage::user("Top state?"),
                ChatMessage::assistant("Maharashtra."),
            ],
            &config,
        );

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are an analyst.");
        assert_eq!(body["contents"].as_array().unwrap().len(), 2);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn test_parse_joins_parts() {
        let json = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}, "finishReason": "STOP"}]
        });
        assert_eq!(parse_generate_content(&json).unwrap(), "Hello world");
    }

    #[test]
    fn test_parse_quota_error_is_retryable() {
        let json = serde_json::json!({
            "error": {"code": 429, "message": "Quota exceeded for quota metric", "status": "RESOURCE_EXHAUSTED"}
        });
        let err = parse_generate_content(&json).unwrap_err();
        assert_eq!(err.status, Some(429));
        assert_eq!(err.classify(), ErrorClass::QuotaExceeded);
    }

    #[test]
    fn test_fallback_chain_order() {
        let llm = GeminiFallbackLlm::new(
            "key".to_string(),
            "gemini-1.5-pro".to_string(),
            GenerationConfig { temperature: 0.1, max_tokens: 10, timeout_secs: 5 },
        )
        .unwrap();
        assert_eq!(
            llm.models_to_try(),
            vec!["gemini-1.5-pro", "gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-flash-8b"]
        );
    }
}
