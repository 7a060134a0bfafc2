use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::outfits::ResolvedOutfit;

const DEFAULT_CHAT_TITLE: &str = "New Session";
const CHAT_TITLE_MAX_CHARS: usize = 30;
const LAST_MESSAGE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry in a chat. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub outfits: Vec<ResolvedOutfit>,
    #[serde(default)]
    pub is_error: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, image: Option<String>) -> Self {
        let text = text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            text: (!text.is_empty()).then_some(text),
            image,
            outfits: Vec::new(),
            is_error: false,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, outfits: Vec<ResolvedOutfit>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            text: Some(text.into()),
            image: None,
            outfits,
            is_error: false,
            created_at: Utc::now(),
        }
    }

    pub fn assistant_error(text: impl Into<String>) -> Self {
        let mut message = Self::assistant(text, Vec::new());
        message.is_error = true;
        message
    }

    /// Text used when the message is replayed as conversation context: the
    /// message text, or a list of outfit names for outfit-only replies.
    pub fn history_content(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|text| !text.is_empty()) {
            return text.to_string();
        }
        if self.outfits.is_empty() {
            return String::new();
        }
        let names = self
            .outfits
            .iter()
            .map(|outfit| outfit.name.as_str())
            .collect::<Vec<&str>>();
        format!("Suggested outfits: {}", names.join(", "))
    }

    /// Session list preview: "Sent a photo" for user photos, the text of
    /// other user messages, and the start of a reply followed by "...".
    pub fn preview(&self) -> String {
        match self.role {
            Role::User if self.image.is_some() => "Sent a photo".to_string(),
            Role::User => self.text.clone().unwrap_or_default(),
            Role::Assistant => {
                let text = self.text.as_deref().unwrap_or_default();
                format!("{}...", truncate_chars(text, LAST_MESSAGE_MAX_CHARS))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_CHAT_TITLE.to_string(),
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bookkeeping for a message just appended. The first user message of a
    /// session names it.
    pub fn note_message(&mut self, message: &ChatMessage, is_first: bool) {
        if is_first && message.role == Role::User {
            if let Some(text) = message.text.as_deref().filter(|text| !text.is_empty()) {
                self.title = truncate_chars(text, CHAT_TITLE_MAX_CHARS);
            }
        }
        self.last_message = Some(message.preview());
        self.updated_at = Utc::now();
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
