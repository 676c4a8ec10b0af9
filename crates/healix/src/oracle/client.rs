//! HTTP oracle client.
//!
//! Speaks either the Ollama `/api/generate` API or an OpenAI-compatible
//! `/v1/chat/completions` API. One request per query, bounded by the
//! configured timeout, no retries.

use super::{build_prompt, SuggestionProvider, SuggestionQuery, SuggestionRecord};
use crate::config::{OracleApi, OracleConfig};
use crate::result::OracleError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

const SYSTEM_PROMPT: &str =
    "You repair broken UI test locators. Reply with a single JSON object and nothing else.";

/// HTTP client for the suggestion oracle
#[derive(Debug, Clone)]
pub struct OracleClient {
    config: OracleConfig,
    client: reqwest::Client,
}

impl OracleClient {
    /// Create a client; the configured timeout bounds every request
    #[must_use]
    pub fn new(mut config: OracleConfig) -> Self {
        config.endpoint = config.endpoint.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Model identifier sent with each request
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Wire format in use
    #[must_use]
    pub const fn api(&self) -> OracleApi {
        self.config.api
    }

    /// Send one query and parse the reply
    pub async fn request_suggestion(
        &self,
        query: &SuggestionQuery,
    ) -> Result<SuggestionRecord, OracleError> {
        let prompt = build_prompt(query);
        let start = Instant::now();
        let text = match self.config.api {
            OracleApi::Ollama => self.generate(&prompt).await?,
            OracleApi::Chat => self.chat(&prompt).await?,
        };
        debug!(
            signature = %query.signature,
            latency_ms = start.elapsed().as_millis() as u64,
            "oracle replied"
        );
        SuggestionRecord::from_oracle_text(&text)
    }

    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/api/generate", self.config.endpoint);
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format: "json",
        };
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        let body: GenerateResponse = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| OracleError::malformed(format!("unexpected generate reply: {e}")))?;
        Ok(body.response)
    }

    async fn chat(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.0,
            stream: false,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        let body: ChatResponse = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| OracleError::malformed(format!("unexpected chat reply: {e}")))?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| OracleError::malformed("chat reply has no choices"))
    }

    /// Check that the oracle endpoint answers
    pub async fn health_check(&self) -> Result<bool, OracleError> {
        let probes: &[&str] = match self.config.api {
            OracleApi::Ollama => &["/api/tags", "/"],
            OracleApi::Chat => &["/health", "/v1/models", "/"],
        };
        for path in probes {
            let url = format!("{}{path}", self.config.endpoint);
            if let Ok(resp) = self.client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(true);
                }
            }
        }
        Err(OracleError::HealthCheckFailed(format!(
            "No health endpoint responded at {}",
            self.config.endpoint
        )))
    }

    fn http_error(&self, err: reqwest::Error) -> OracleError {
        if err.is_timeout() {
            OracleError::Timeout {
                ms: duration_ms(self.config.timeout()),
            }
        } else {
            OracleError::Http(err)
        }
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, OracleError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(OracleError::Api {
        status: status.as_u16(),
        body,
    })
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl SuggestionProvider for OracleClient {
    async fn suggest(&self, query: &SuggestionQuery) -> Option<SuggestionRecord> {
        match self.request_suggestion(query).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(signature = %query.signature, error = %e, "oracle gave no usable suggestion");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = OracleClient::new(OracleConfig {
            endpoint: "http://localhost:11434/".to_string(),
            ..OracleConfig::default()
        });
        assert_eq!(client.endpoint(), "http://localhost:11434");
        assert_eq!(client.model(), "qwen2.5-coder:7b");
        assert_eq!(client.api(), OracleApi::Ollama);
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: "json",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"model": "m", "prompt": "p", "stream": false, "format": "json"})
        );
    }

    #[test]
    fn test_chat_request_asks_for_json_object() {
        let request = ChatRequest {
            model: "m",
            messages: vec![],
            temperature: 0.0,
            stream: false,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""response_format":{"type":"json_object"}"#));
    }

    #[test]
    fn test_chat_response_extra_fields_ignored() {
        let json = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{}"},"finish_reason":"stop"}],"usage":null}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices[0].message.content, "{}");
    }

    #[tokio::test]
    async fn test_unreachable_oracle_is_no_suggestion() {
        let client = OracleClient::new(OracleConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            ..OracleConfig::default()
        });
        let query = SuggestionQuery {
            signature: "#a".to_string(),
            context: crate::sanitizer::SanitizedContext::default(),
            error_context: String::new(),
            page_errors: Vec::new(),
        };
        assert!(client.suggest(&query).await.is_none());
        assert!(client.health_check().await.is_err());
    }
}
