//! Google Gemini provider.
//!
//! Gemini API: https://ai.google.dev/api/generate-content

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use agriqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Public Generative Language API endpoint.
    pub const DEFAULT_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client for Gemini: {}", e))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn to_generate_request(&self, request: &LlmRequest) -> GenerateRequest {
        let text_content = |role: Option<&str>, text: String| Content {
            role: role.map(str::to_string),
            parts: vec![Part { text }],
        };

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GenerateRequest {
            system_instruction: request.effective_system().map(|s| text_content(None, s)),
            contents: vec![text_content(Some("user"), request.prompt.clone())],
            generation_config,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending generateContent request (model: {})", request.model);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&self.to_generate_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Gemini: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let content = extract_text(&body)
            .ok_or_else(|| AppError::Llm("Gemini returned no candidates".to_string()))?;

        let usage = body
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage,
        })
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &GenerateResponse) -> Option<String> {
    let content = body.candidates.first()?.content.as_ref()?;
    let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(GeminiClient::DEFAULT_URL, "k", 5).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_request_serialization() {
        let client = GeminiClient::new(GeminiClient::DEFAULT_URL, "k", 5).unwrap();
        let request = LlmRequest::new("Rainfall in Kerala?", "gemini-2.5-pro")
            .with_system("You are a climate analyst.")
            .with_temperature(0.2);

        let json = serde_json::to_value(client.to_generate_request(&request)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Rainfall in Kerala?");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a climate analyst."
        );
        assert!(json["systemInstruction"].get("role").is_none());
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let json = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Kerala "},{"text":"receives heavy rain."}]}}]}"#;
        let body: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text(&body).as_deref(), Some("Kerala receives heavy rain."));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_text(&empty).is_none());
    }
}
