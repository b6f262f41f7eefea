use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::http_client::Transport;

/// Output contract for one completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Any JSON object.
    JsonObject,
    /// Strict named JSON schema.
    Schema { name: &'static str, schema: Value },
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub format: ResponseFormat,
    pub temperature: Option<f64>,
}

/// Chat model seam. Agents, the synthesizer and the script writer only see
/// this; tests swap in canned responders.
pub trait CompletionModel: Send + Sync {
    /// Raw JSON text of the assistant message.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;

    fn complete_json(&self, request: &CompletionRequest) -> Result<Value> {
        let text = self.complete(request)?;
        parse_json_reply(&text)
    }
}

/// Accepts bare JSON or a single fenced block.
pub fn parse_json_reply(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body).context("model reply was not valid JSON")
}

/// OpenAI-compatible `chat/completions` client.
pub struct OpenAiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(transport: Arc<dyn Transport>, config: &ModelConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

pub fn request_body(request: &CompletionRequest) -> Value {
    let response_format = match &request.format {
        ResponseFormat::JsonObject => json!({"type": "json_object"}),
        ResponseFormat::Schema { name, schema } => json!({
            "type": "json_schema",
            "json_schema": {"name": name, "strict": true, "schema": schema}
        }),
    };
    let mut body = json!({
        "model": request.model,
        "messages": [
            {"role": "system", "content": request.system},
            {"role": "user", "content": request.user}
        ],
        "response_format": response_format
    });
    if let Some(t) = request.temperature {
        body["temperature"] = json!(t);
    }
    body
}

impl CompletionModel for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("model api key not configured"))?;
        let url = format!("{}/chat/completions", self.base_url);
        let auth = format!("Bearer {key}");
        let headers = [("Authorization", auth.as_str())];
        debug!(model = %request.model, "chat completion request");

        let resp = self
            .transport
            .post_json(&url, &headers, &request_body(request))
            .map_err(|err| anyhow!("chat completion transport error: {err}"))?;
        if !resp.is_success() {
            warn!(status = resp.status, "chat completion failed");
            bail!("chat completion returned {}: {}", resp.status, resp.text());
        }
        let payload: Value =
            serde_json::from_slice(&resp.body).context("chat completion body was not JSON")?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("chat completion had no message content"))
    }
}
