use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-exp-image-generation";
pub const DEFAULT_TEXT_RETRIES: usize = 2;
pub const DEFAULT_IMAGE_RETRIES: usize = 1;
pub const DEFAULT_MAX_IMAGE_WIDTH: u32 = 800;

/// Settings shared by the generative clients.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    env_api_key: Option<String>,
    fallback_api_key: Option<String>,
    pub api_base: String,
    pub text_model: String,
    pub image_model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub text_retries: usize,
    pub image_retries: usize,
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            env_api_key: None,
            fallback_api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            temperature: 0.7,
            max_output_tokens: 8192,
            text_retries: DEFAULT_TEXT_RETRIES,
            image_retries: DEFAULT_IMAGE_RETRIES,
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            env_api_key: non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY")),
            fallback_api_key: None,
            api_base: non_empty_env("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            text_model: non_empty_env("WAIR_TEXT_MODEL").unwrap_or(defaults.text_model),
            image_model: non_empty_env("WAIR_IMAGE_MODEL").unwrap_or(defaults.image_model),
            ..defaults
        }
    }

    /// Key injected by the host, used only when the environment has none.
    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        self.fallback_api_key = key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    /// Replaces the environment-provided key. Mostly for tests and embedding.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.env_api_key = key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.env_api_key
            .as_deref()
            .or(self.fallback_api_key.as_deref())
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
