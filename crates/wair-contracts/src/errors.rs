use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes reported by the generative backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorKind {
    NoApiKey,
    RateLimit,
    ApiError,
    EmptyResponse,
    ParseError,
    ImageGenError,
    NoImage,
}

impl ApiErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::NoApiKey => "NO_API_KEY",
            Self::RateLimit => "RATE_LIMIT",
            Self::ApiError => "API_ERROR",
            Self::EmptyResponse => "EMPTY_RESPONSE",
            Self::ParseError => "PARSE_ERROR",
            Self::ImageGenError => "IMAGE_GEN_ERROR",
            Self::NoImage => "NO_IMAGE",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error raised by a generative client.
///
/// `retryable` is decided where the error is raised and is the only input the
/// retry policy looks at; `kind` is for callers and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn no_api_key() -> Self {
        Self::new(
            ApiErrorKind::NoApiKey,
            "API key not configured. Set GEMINI_API_KEY or provide a fallback key.",
            false,
        )
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimit, message, true)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::ApiError, message, false)
    }

    pub fn empty_response() -> Self {
        Self::new(ApiErrorKind::EmptyResponse, "Empty response from AI", true)
    }

    pub fn parse_error() -> Self {
        Self::new(ApiErrorKind::ParseError, "Failed to parse AI response", true)
    }

    pub fn image_gen(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(ApiErrorKind::ImageGenError, message, retryable)
    }

    pub fn no_image() -> Self {
        Self::new(ApiErrorKind::NoImage, "No image generated", true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_wire_code() {
        let err = ApiError::rate_limit("HTTP 503");
        assert_eq!(err.to_string(), "RATE_LIMIT: HTTP 503");
        assert!(err.retryable);
    }

    #[test]
    fn kind_serializes_as_wire_code() -> anyhow::Result<()> {
        let raw = serde_json::to_string(&ApiErrorKind::ImageGenError)?;
        assert_eq!(raw, "\"IMAGE_GEN_ERROR\"");
        let parsed: ApiErrorKind = serde_json::from_str("\"NO_API_KEY\"")?;
        assert_eq!(parsed, ApiErrorKind::NoApiKey);
        Ok(())
    }

    #[test]
    fn configuration_and_rejection_are_terminal() {
        assert!(!ApiError::no_api_key().retryable);
        assert!(!ApiError::rejected("bad request").retryable);
        assert!(ApiError::empty_response().retryable);
        assert!(ApiError::parse_error().retryable);
        assert!(ApiError::no_image().retryable);
    }
}
