//! Hosted text-generation client (Hugging Face Inference API request/response shape).
//!
//! `POST <endpoint>` with `Authorization: Bearer <token>` and
//! `{"inputs": ..., "parameters": {"max_length": ..., "temperature": ...}}`;
//! a success body is a JSON array whose first object carries `generated_text`.

use super::{AnswerBackend, BackendFailure};
use crate::config::BackendConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sent instead of an empty or unreadable answer.
pub const PROCESSING_PLACEHOLDER: &str =
    "I'm still processing your question. Please ask again in a moment.";

/// Client for a text-generation inference endpoint.
#[derive(Clone)]
pub struct InferenceHttpBackend {
    endpoint: String,
    api_token: Option<String>,
    timeout: Duration,
    max_length: u32,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    max_length: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: Option<String>,
}

impl InferenceHttpBackend {
    /// Without `api_token` every `ask` fails with `NotConfigured` and no request is made.
    pub fn new(
        endpoint: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
        max_length: u32,
        temperature: f32,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            timeout,
            max_length,
            temperature,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &BackendConfig, api_token: Option<String>) -> Self {
        Self::new(
            config.endpoint(),
            api_token,
            config.request_timeout(),
            config.max_answer_length,
            config.temperature,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }
}

/// Answer text from a 200 body; malformed bodies and empty generations become the placeholder.
fn answer_from_body(body: &str) -> String {
    let generations: Vec<Generation> = match serde_json::from_str(body) {
        Ok(g) => g,
        Err(e) => {
            log::warn!("inference: malformed response body ({}), answering with placeholder", e);
            return PROCESSING_PLACEHOLDER.to_string();
        }
    };
    match generations.into_iter().next().and_then(|g| g.generated_text) {
        Some(text) if !text.trim().is_empty() => text,
        _ => {
            log::debug!("inference: empty generation, answering with placeholder");
            PROCESSING_PLACEHOLDER.to_string()
        }
    }
}

#[async_trait]
impl AnswerBackend for InferenceHttpBackend {
    fn name(&self) -> &str {
        "inference"
    }

    async fn ask(&self, question: &str) -> Result<String, BackendFailure> {
        let token = self
            .api_token
            .as_deref()
            .ok_or(BackendFailure::NotConfigured)?;
        let body = GenerateRequest {
            inputs: question,
            parameters: GenerateParameters {
                max_length: self.max_length,
                temperature: self.temperature,
            },
        };
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendFailure::Unavailable(e.to_string()))?;
        let status = res.status();
        if status != reqwest::StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(BackendFailure::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        let text = res
            .text()
            .await
            .map_err(|e| BackendFailure::Unavailable(e.to_string()))?;
        Ok(answer_from_body(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FailureKind;

    #[test]
    fn first_generation_is_the_answer() {
        let body = r#"[{"generated_text": "4"}, {"generated_text": "four"}]"#;
        assert_eq!(answer_from_body(body), "4");
    }

    #[test]
    fn missing_or_empty_generation_is_placeholder() {
        for body in ["[]", "[{}]", r#"[{"generated_text": "  "}]"#, r#"[{"score": 0.1}]"#] {
            assert_eq!(answer_from_body(body), PROCESSING_PLACEHOLDER, "body: {}", body);
        }
    }

    #[test]
    fn non_array_body_is_placeholder() {
        for body in [r#"{"generated_text": "x"}"#, "not json", ""] {
            assert_eq!(answer_from_body(body), PROCESSING_PLACEHOLDER, "body: {}", body);
        }
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            inputs: "hi",
            parameters: GenerateParameters {
                max_length: 50,
                temperature: 0.5,
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "inputs": "hi", "parameters": { "max_length": 50, "temperature": 0.5 } })
        );
    }

    #[tokio::test]
    async fn blank_token_counts_as_missing() {
        let backend = InferenceHttpBackend::new(
            "http://127.0.0.1:9/never",
            Some("  ".to_string()),
            Duration::from_secs(1),
            10,
            0.5,
        );
        assert!(!backend.is_configured());
        let err = backend.ask("hi").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotConfigured);
    }
}
