use std::sync::Arc;

use serde_json::{json, Value};
use wair_contracts::ApiError;

use crate::codec::strip_data_url;
use crate::config::EngineConfig;
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::transport::{HttpReply, Transport};

/// Multi-image prompt against the image model; returns one data URL.
pub struct GenerativeImageClient {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl GenerativeImageClient {
    pub fn new(config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        let policy = RetryPolicy::new(config.image_retries);
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

    /// `reference_images` are sent in order after the prompt: the subject
    /// photo first, then garments. Empty entries are skipped.
    pub fn generate_image(
        &self,
        prompt: &str,
        reference_images: &[String],
    ) -> Result<String, ApiError> {
        let api_key = self.config.api_key().ok_or_else(ApiError::no_api_key)?;
        let endpoint = self.config.endpoint_for_model(&self.config.image_model);
        let payload = build_payload(prompt, reference_images);

        self.policy.run(self.sleeper.as_ref(), |attempt| {
            tracing::debug!(
                attempt,
                model = %self.config.image_model,
                references = reference_images.len(),
                "image generation request"
            );
            let reply = self
                .transport
                .post_json(&endpoint, api_key, &payload)
                .map_err(|err| ApiError::image_gen(format!("{err:#}"), false))?;
            extract_image(&reply)
        })
    }
}

fn build_payload(prompt: &str, reference_images: &[String]) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    for image in reference_images.iter().filter(|image| !image.is_empty()) {
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
            "responseModalities": ["IMAGE", "TEXT"],
        }
    })
}

fn extract_image(reply: &HttpReply) -> Result<String, ApiError> {
    if !reply.is_success() {
        let message = reply
            .error_message()
            .unwrap_or_else(|| "Image generation failed".to_string());
        return Err(ApiError::image_gen(message, true));
    }

    let body = serde_json::from_str::<Value>(&reply.body).map_err(|_| ApiError::no_image())?;
    let parts = body
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let inline = parts
        .iter()
        .find_map(|part| part.get("inlineData").or_else(|| part.get("inline_data")))
        .ok_or_else(ApiError::no_image)?;
    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())
        .ok_or_else(ApiError::no_image)?;
    let mime_type = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str)
        .filter(|mime| !mime.is_empty())
        .unwrap_or("image/png");
    Ok(format!("data:{mime_type};base64,{data}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wair_contracts::ApiErrorKind;

    use super::*;
    use crate::retry::RecordingSleeper;
    use crate::transport::testing::ScriptedTransport;

    fn client(
        transport: &Arc<ScriptedTransport>,
        sleeper: &Arc<RecordingSleeper>,
    ) -> GenerativeImageClient {
        let config = EngineConfig::default().with_api_key(Some("test-key".to_string()));
        GenerativeImageClient::new(config, transport.clone()).with_sleeper(sleeper.clone())
    }

    fn image_reply(mime: Option<&str>) -> String {
        let mut inline = json!({ "data": "SU1H" });
        if let Some(mime) = mime {
            inline["mimeType"] = json!(mime);
        }
        json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here is the look."},
                {"inlineData": inline}
            ]}}]
        })
        .to_string()
    }

    #[test]
    fn returns_first_inline_image_with_its_mime_type() -> anyhow::Result<()> {
        let transport = Arc::new(ScriptedTransport::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        transport.push_status(200, &image_reply(Some("image/webp")));

        let image = client(&transport, &sleeper).generate_image(
            "Dress this person",
            &[
                "data:image/jpeg;base64,UEVSU09O".to_string(),
                String::new(),
                "data:image/jpeg;base64,U0hJUlQ=".to_string(),
            ],
        )?;
        assert_eq!(image, "data:image/webp;base64,SU1H");

        let requests = transport.requests();
        let parts = requests[0]["contents"][0]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], json!("Dress this person"));
        assert_eq!(parts[1]["inlineData"]["data"], json!("UEVSU09O"));
        assert_eq!(parts[2]["inlineData"]["data"], json!("U0hJUlQ="));
        assert_eq!(
            requests[0]["generationConfig"]["responseModalities"],
            json!(["IMAGE", "TEXT"])
        );
        Ok(())
    }

    #[test]
    fn mime_type_defaults_to_png() -> anyhow::Result<()> {
        let transport = Arc::new(ScriptedTransport::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        transport.push_status(200, &image_reply(None));
        let image = client(&transport, &sleeper).generate_image("p", &[])?;
        assert_eq!(image, "data:image/png;base64,SU1H");
        Ok(())
    }

    #[test]
    fn text_only_reply_is_retried_once_then_reported() {
        let transport = Arc::new(ScriptedTransport::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let text_only = json!({"candidates": [{"content": {"parts": [{"text": "Sorry"}]}}]});
        for _ in 0..3 {
            transport.push_status(200, &text_only.to_string());
        }

        let err = client(&transport, &sleeper).generate_image("p", &[]).err();
        assert_eq!(err.map(|err| err.kind), Some(ApiErrorKind::NoImage));
        assert_eq!(transport.calls(), 2);
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(1000)]);
    }

    #[test]
    fn http_failure_recovers_within_budget() -> anyhow::Result<()> {
        let transport = Arc::new(ScriptedTransport::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        transport.push_status(400, r#"{"error":{"message":"Image input too large"}}"#);
        transport.push_status(200, &image_reply(Some("image/png")));

        let image = client(&transport, &sleeper).generate_image("p", &[])?;
        assert!(image.starts_with("data:image/png;base64,"));
        assert_eq!(transport.calls(), 2);
        Ok(())
    }

    #[test]
    fn http_failure_message_is_kept_after_budget() {
        let transport = Arc::new(ScriptedTransport::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        transport.push_status(500, "");
        transport.push_status(500, "");

        let err = client(&transport, &sleeper).generate_image("p", &[]).err();
        assert_eq!(
            err.clone().map(|err| err.kind),
            Some(ApiErrorKind::ImageGenError)
        );
        assert_eq!(
            err.map(|err| err.message).as_deref(),
            Some("Image generation failed")
        );
    }

    #[test]
    fn missing_key_is_reported_before_dispatch() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = GenerativeImageClient::new(EngineConfig::default(), transport.clone());
        let err = client.generate_image("p", &[]).err();
        assert_eq!(err.map(|err| err.kind), Some(ApiErrorKind::NoApiKey));
        assert_eq!(transport.calls(), 0);
    }
}
