//! Google Gemini reply generator

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ReplyGenerator, http_client};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Header carrying the API key, so it never appears in request URLs
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.trim().is_empty())
    }
}

/// Generates replies with the Gemini `generateContent` REST API
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Create a new Gemini generator
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String, request_timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Gemini API key required".to_string()));
        }

        Ok(Self {
            client: http_client(request_timeout)?,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ReplyGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "requesting Gemini reply"
        );

        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                tracing::error!(error = %e, "Gemini request failed");
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gemini API error");
            return Err(Error::Llm(format!("Gemini API error {status}: {body}")));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        let reply = result
            .first_text()
            .ok_or_else(|| Error::Llm("Gemini returned empty response".to_string()))?;

        tracing::info!(reply_chars = reply.len(), "reply generated");
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: "User: hi\nAssistant:" }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"contents": [{"parts": [{"text": "User: hi\nAssistant:"}]}]})
        );
    }

    #[test]
    fn test_first_text_extraction() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [
                {"text": "hi there"}, {"text": "ignored"}
            ]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text().as_deref(), Some("hi there"));
    }

    #[test]
    fn test_missing_or_blank_text_is_none() {
        for body in [
            r#"{}"#,
            r#"{"candidates": []}"#,
            r#"{"candidates": [{}]}"#,
            r#"{"candidates": [{"content": {"parts": []}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"text": "   "}]}}]}"#,
        ] {
            let response: GenerateResponse = serde_json::from_str(body).unwrap();
            assert!(response.first_text().is_none(), "expected none for {body}");
        }
    }

    #[test]
    fn test_endpoint_includes_model() {
        let llm = GeminiGenerator::new(
            "key".to_string(),
            DEFAULT_MODEL.to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url("http://localhost:8080/");
        assert_eq!(
            llm.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let result = GeminiGenerator::new(
            String::new(),
            DEFAULT_MODEL.to_string(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let llm = GeminiGenerator::new(
            "SECRET-KEY-123".to_string(),
            DEFAULT_MODEL.to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:1");

        let err = llm.generate("User: hi\nAssistant:").await.unwrap_err();

        assert!(matches!(err, Error::Http(_)));
        let message = err.to_string();
        assert!(!message.contains("SECRET-KEY-123"), "key leaked: {message}");
        assert!(!message.contains("generateContent"), "url leaked: {message}");
    }
}
