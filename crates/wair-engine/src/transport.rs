use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;

/// Raw HTTP outcome; status interpretation belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `error.message` from a Google-style error body, if present.
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_str::<Value>(&self.body)
            .ok()?
            .get("error")?
            .get("message")?
            .as_str()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string)
    }
}

pub trait Transport: Send + Sync {
    /// POSTs `payload` as JSON. `Err` means no HTTP response was received.
    fn post_json(&self, url: &str, api_key: &str, payload: &Value) -> Result<HttpReply>;
}

pub struct HttpTransport {
    http: HttpClient,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpClient::new(),
            timeout,
        }
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, api_key: &str, payload: &Value) -> Result<HttpReply> {
        let response = self
            .http
            .post(url)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(payload)
            .send()
            .with_context(|| format!("request failed ({url})"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("response body read failed ({url})"))?;
        Ok(HttpReply { status, body })
    }
}
