use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use wair_contracts::ApiError;

use crate::codec::strip_data_url;
use crate::config::EngineConfig;
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::transport::{HttpReply, Transport};

/// Single-turn JSON generation against the text model.
pub struct GenerativeTextClient {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl GenerativeTextClient {
    pub fn new(config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        let policy = RetryPolicy::new(config.text_retries);
        Self {
            config,
            transport,
            sleeper: Arc::new(ThreadSleeper),
            policy,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.policy.max_retries = retries;
        self
    }

    /// Sends `prompt` (prefixed by `system_instruction`) plus an optional
    /// inline image and returns the parsed JSON the model answered with.
    pub fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        inline_image: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.generate_with(prompt, system_instruction, inline_image, Ok)
    }

    /// Like [`generate`](Self::generate), decoded into `T`. A reply of the
    /// wrong shape counts as a parse failure and is retried like one.
    pub fn generate_as<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        inline_image: Option<&str>,
    ) -> Result<T, ApiError> {
        self.generate_with(prompt, system_instruction, inline_image, |value| {
            serde_json::from_value(value).map_err(|err| {
                tracing::warn!("AI response did not match the expected shape: {err}");
                ApiError::parse_error()
            })
        })
    }

    fn generate_with<T>(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        inline_image: Option<&str>,
        decode: impl Fn(Value) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let api_key = self.config.api_key().ok_or_else(ApiError::no_api_key)?;
        let endpoint = self.config.endpoint_for_model(&self.config.text_model);
        let payload = self.build_payload(prompt, system_instruction, inline_image);

        self.policy.run(self.sleeper.as_ref(), |attempt| {
            tracing::debug!(attempt, model = %self.config.text_model, "text generation request");
            let reply = self
                .transport
                .post_json(&endpoint, api_key, &payload)
                .map_err(|err| ApiError::rejected(format!("{err:#}")))?;
            decode(parse_reply(&reply)?)
        })
    }

    fn build_payload(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        inline_image: Option<&str>,
    ) -> Value {
        let full_prompt = match system_instruction.filter(|value| !value.trim().is_empty()) {
            Some(system) => format!("{system}\n\n{prompt}"),
            None => prompt.to_string(),
        };
        let mut parts = vec![json!({ "text": full_prompt })];
        if let Some(image) = inline_image.filter(|value| !value.is_empty()) {
            parts.push(json!({
                "inlineData": {
                    "mimeType": "image/jpeg",
                    "data": strip_data_url(image),
                }
            }));
        }
        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            }
        })
    }
}

fn parse_reply(reply: &HttpReply) -> Result<Value, ApiError> {
    if !reply.is_success() {
        let message = reply
            .error_message()
            .unwrap_or_else(|| format!("HTTP {}", reply.status));
        if reply.status == 429 || reply.status >= 500 {
            return Err(ApiError::rate_limit(message));
        }
        return Err(ApiError::rejected(message));
    }

    let text = serde_json::from_str::<Value>(&reply.body)
        .ok()
        .and_then(|body| first_candidate_text(&body))
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(ApiError::empty_response)?;

    let cleaned = strip_code_fences(&text);
    serde_json::from_str(&cleaned).map_err(|err| {
        tracing::warn!(error = %err, raw = %text, "JSON parse error in AI response");
        ApiError::parse_error()
    })
}

fn first_candidate_text(body: &Value) -> Option<String> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

/// Drops every "```json" and "```" marker and trims.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}
