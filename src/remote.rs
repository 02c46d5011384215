//! Completion over HTTP instead of an in-process model.
//!
//! Three request shapes are supported: OpenAI-style completions, a plain
//! `{model, input}` service returning `generated_text`, and Ollama's
//! `/api/generate`, which answers with newline-delimited JSON.

use crate::config::Settings;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Wire format expected by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    OpenAi,
    Custom,
    Ollama,
}

impl Protocol {
    /// Ollama is recognized by its endpoint path; otherwise the settings flag
    /// decides between the OpenAI and custom shapes.
    pub fn detect(endpoint: &str, openai_compatible: bool) -> Self {
        if endpoint.trim_end_matches('/').ends_with("/api/generate") {
            Protocol::Ollama
        } else if openai_compatible {
            Protocol::OpenAi
        } else {
            Protocol::Custom
        }
    }
}

/// Client for a single remote completion endpoint.
pub struct RemoteBackend {
    client: Client,
    endpoint: String,
    protocol: Protocol,
    model: String,
    max_tokens: usize,
    api_key: Option<String>,
}

impl RemoteBackend {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let endpoint = settings
            .remote_endpoint()
            .ok_or_else(|| Error::InvalidConfig("remote backend needs an endpoint".to_string()))?;
        let protocol = if settings.uses_ollama() {
            Protocol::Ollama
        } else {
            Protocol::detect(&endpoint, settings.openai_compatible)
        };
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            endpoint,
            protocol,
            model: settings.model_name.clone(),
            max_tokens: settings.max_new_tokens,
            api_key: settings.api_key.clone(),
        })
    }

    /// Send the prompt and return the completion text.
    pub fn complete(&self, prompt: &str) -> Result<String> {
        info!(endpoint = %self.endpoint, protocol = ?self.protocol, "sending prompt");
        let body = request_body(self.protocol, &self.model, prompt, self.max_tokens);

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(Error::Remote(format!("{} returned {}: {}", self.endpoint, status, text)));
        }
        debug!(bytes = text.len(), "response received");

        parse_response(self.protocol, &text)
    }
}

/// JSON request body for `protocol`.
pub fn request_body(protocol: Protocol, model: &str, prompt: &str, max_tokens: usize) -> Value {
    match protocol {
        Protocol::OpenAi => json!({
            "model": model,
            "prompt": prompt,
            "max_tokens": max_tokens,
        }),
        Protocol::Custom => json!({
            "model": model,
            "input": prompt,
            "max_tokens": max_tokens,
        }),
        Protocol::Ollama => json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": max_tokens },
        }),
    }
}

/// Extract the completion text from a response body.
pub fn parse_response(protocol: Protocol, body: &str) -> Result<String> {
    match protocol {
        Protocol::OpenAi => {
            let value: Value = serde_json::from_str(body).map_err(|e| Error::Remote(e.to_string()))?;
            value
                .pointer("/choices/0/text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::Remote("response has no choices[0].text".to_string()))
        }
        Protocol::Custom => {
            let value: Value = serde_json::from_str(body).map_err(|e| Error::Remote(e.to_string()))?;
            value
                .get("generated_text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::Remote("response has no generated_text".to_string()))
        }
        Protocol::Ollama => {
            // One JSON object per line, each carrying a slice of the answer
            let collected: String = body
                .lines()
                .filter_map(|line| serde_json::from_str::<Value>(line).ok())
                .filter_map(|v| v.get("response").and_then(Value::as_str).map(str::to_string))
                .collect();
            if collected.is_empty() {
                Err(Error::Remote("response contained no text".to_string()))
            } else {
                Ok(collected)
            }
        }
    }
}
