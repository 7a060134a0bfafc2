//! Styling activity log: one `LoggedEvent` per line of a JSONL file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ApiErrorKind;
use crate::wardrobe::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    Outfits,
    Critique,
}

/// What the styling engine did. `chat` is always a chat session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StylingEvent {
    ChatRequest {
        chat: String,
        mode: ChatMode,
        history: usize,
        wardrobe: usize,
    },
    OutfitsResolved {
        chat: String,
        proposed: usize,
        kept: usize,
        /// Resolved item count of each kept outfit.
        items: Vec<usize>,
    },
    ChatReply {
        chat: String,
        outfits: usize,
    },
    ChatFailed {
        chat: String,
        code: ApiErrorKind,
        message: String,
    },
    GarmentAnalyzed {
        category: Category,
        subcategory: String,
        color: String,
    },
    ProfileAnalyzed {
        summary: String,
    },
    InsightsReady {
        items: usize,
        palette: Vec<String>,
    },
    TryOnReady {
        outfit: String,
        references: usize,
    },
    TryOnFailed {
        outfit: String,
        code: ApiErrorKind,
        message: String,
    },
}

impl StylingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatRequest { .. } => "chat_request",
            Self::OutfitsResolved { .. } => "outfits_resolved",
            Self::ChatReply { .. } => "chat_reply",
            Self::ChatFailed { .. } => "chat_failed",
            Self::GarmentAnalyzed { .. } => "garment_analyzed",
            Self::ProfileAnalyzed { .. } => "profile_analyzed",
            Self::InsightsReady { .. } => "insights_ready",
            Self::TryOnReady { .. } => "try_on_ready",
            Self::TryOnFailed { .. } => "try_on_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub at: DateTime<Utc>,
    pub user: String,
    #[serde(flatten)]
    pub event: StylingEvent,
}

/// Appends events for one user. Clones write to the same file under one lock.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: Arc<PathBuf>,
    user: String,
    lock: Arc<Mutex<()>>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            path: Arc::new(path.into()),
            user: user.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: StylingEvent) -> Result<LoggedEvent> {
        let logged = LoggedEvent {
            at: Utc::now(),
            user: self.user.clone(),
            event,
        };
        let mut line = serde_json::to_string(&logged)?;
        line.push('\n');

        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_ref())
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .with_context(|| format!("failed appending to {}", self.path.display()))?;
        Ok(logged)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn read_back(path: &Path) -> anyhow::Result<Vec<LoggedEvent>> {
        fs::read_to_string(path)?
            .lines()
            .map(|line| Ok(serde_json::from_str(line)?))
            .collect()
    }

    #[test]
    fn events_are_tagged_flat_json_lines() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("events.jsonl");
        let log = EventLog::new(&path, "ana");

        log.append(StylingEvent::OutfitsResolved {
            chat: "chat-1".to_string(),
            proposed: 2,
            kept: 1,
            items: vec![3],
        })?;

        let raw = fs::read_to_string(&path)?;
        let row: serde_json::Value = serde_json::from_str(raw.trim_end())?;
        assert_eq!(row["type"], "outfits_resolved");
        assert_eq!(row["user"], "ana");
        assert_eq!(row["kept"], 1);
        assert!(row["at"].is_string());
        Ok(())
    }

    #[test]
    fn error_codes_and_categories_keep_their_wire_names() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let log = EventLog::new(&path, "ana");

        let failed = log.append(StylingEvent::TryOnFailed {
            outfit: "Office".to_string(),
            code: ApiErrorKind::NoImage,
            message: "No image generated".to_string(),
        })?;
        log.append(StylingEvent::GarmentAnalyzed {
            category: Category::Shoes,
            subcategory: "Loafers".to_string(),
            color: "Brown".to_string(),
        })?;

        let rows = read_back(&path)?;
        assert_eq!(rows[0], failed);
        assert_eq!(rows[1].event.name(), "garment_analyzed");
        let raw = fs::read_to_string(&path)?;
        assert!(raw.contains("\"code\":\"NO_IMAGE\""));
        Ok(())
    }

    #[test]
    fn clones_share_one_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let log = EventLog::new(&path, "ana");
        let other = log.clone();

        log.append(StylingEvent::ProfileAnalyzed {
            summary: "olive skin".to_string(),
        })?;
        other.append(StylingEvent::ChatReply {
            chat: "chat-1".to_string(),
            outfits: 0,
        })?;

        let names = read_back(&path)?
            .iter()
            .map(|row| row.event.name())
            .collect::<Vec<&str>>();
        assert_eq!(names, vec!["profile_analyzed", "chat_reply"]);
        Ok(())
    }
}
