// src/assistant/backend.rs
//! Generation backend abstraction + the OpenAI implementation and a
//! deterministic mock for tests/local runs.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    /// Ask the model for a JSON object; callers still validate the shape.
    Json,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str, format: ResponseFormat) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub type SharedBackend = Arc<dyn GenerationBackend>;

/// Factory honoring the test-mode override: `GEN_TEST_MODE=mock` swaps in
/// the deterministic mock regardless of configuration.
pub fn build_backend(api_key: &str, model: &str) -> SharedBackend {
    if std::env::var("GEN_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockBackend {
            structured: Some(r#"{"ticker": null, "intent": "chat"}"#.to_string()),
            completion: Some("Mock answer.".to_string()),
        });
    }
    Arc::new(OpenAiBackend::new(api_key, model))
}

/// OpenAI Chat Completions backend. Requests carry a bounded timeout so a
/// hanging generation call can stall at most one request task.
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("market-copilot/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<FormatSpec>,
}

#[derive(Serialize)]
struct FormatSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn generate(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        if self.api_key.is_empty() {
            anyhow::bail!("generation api key not configured");
        }

        let response_format = match format {
            ResponseFormat::Text => None,
            ResponseFormat::Json => Some(FormatSpec {
                kind: "json_object",
            }),
        };
        let req = ChatRequest {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
            response_format,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("generation request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(anyhow!("generation backend error ({status}): {detail}"));
        }

        let body: ChatResponse = resp.json().await.context("generation body")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("generation backend returned no content"))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Scriptable backend for tests. `None` in either slot simulates an outage
/// for that response format.
pub struct MockBackend {
    pub structured: Option<String>,
    pub completion: Option<String>,
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, _prompt: &str, format: ResponseFormat) -> Result<String> {
        let slot = match format {
            ResponseFormat::Json => &self.structured,
            ResponseFormat::Text => &self.completion,
        };
        slot.clone()
            .ok_or_else(|| anyhow!("mock backend offline"))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Strip markdown code fences some models wrap JSON answers in.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_code_blocks_handles_fenced_and_bare_json() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[tokio::test]
    async fn mock_backend_errors_when_slot_is_empty() {
        let b = MockBackend {
            structured: None,
            completion: Some("hi".into()),
        };
        assert!(b.generate("x", ResponseFormat::Json).await.is_err());
        assert_eq!(b.generate("x", ResponseFormat::Text).await.unwrap(), "hi");
    }
}
