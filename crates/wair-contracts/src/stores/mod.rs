//! Persistence collaborators.
//!
//! The hosted document store is outside this workspace; these traits are the
//! seam the engine talks to. [`JsonFileStore`] backs all three with one JSON
//! document per user, which is enough for the CLI host and for tests.

mod file;

use std::sync::mpsc::Receiver;

use anyhow::Result;
use chrono::Utc;

use crate::chat::{ChatMessage, ChatSession};
use crate::profile::Profile;
use crate::wardrobe::{NewWardrobeItem, WardrobeItem};

pub use file::JsonFileStore;

pub trait InventoryStore: Send + Sync {
    /// Stores a fully built item, replacing any item with the same id.
    fn insert(&self, user: &str, item: WardrobeItem) -> Result<WardrobeItem>;

    /// Newest first.
    fn list(&self, user: &str) -> Result<Vec<WardrobeItem>>;

    /// Returns whether an item was removed.
    fn delete(&self, user: &str, id: &str) -> Result<bool>;

    /// Receives the full inventory after every change.
    fn subscribe(&self, user: &str) -> Receiver<Vec<WardrobeItem>>;

    fn create(&self, user: &str, draft: NewWardrobeItem) -> Result<WardrobeItem> {
        let item = WardrobeItem::new(uuid::Uuid::new_v4().to_string(), draft, Utc::now());
        self.insert(user, item)
    }
}

pub trait ChatStore: Send + Sync {
    fn create_session(&self, user: &str) -> Result<ChatSession>;

    /// Most recently updated first.
    fn list_sessions(&self, user: &str) -> Result<Vec<ChatSession>>;

    fn get_session(&self, user: &str, session_id: &str) -> Result<Option<ChatSession>>;


    /// Removes the session and all of its messages.
    fn delete_session(&self, user: &str, session_id: &str) -> Result<bool>;

    /// Appends `message` and, in the same write, refreshes the session's
    /// title, preview and `updated_at`. Fails when the session is unknown.
    fn append_message(&self, user: &str, session_id: &str, message: ChatMessage) -> Result<()>;

    /// Oldest first.
    fn list_messages(&self, user: &str, session_id: &str) -> Result<Vec<ChatMessage>>;

    /// Receives the full ordered message list after every append.
    fn subscribe_messages(&self, user: &str, session_id: &str) -> Receiver<Vec<ChatMessage>>;
}

pub trait ProfileStore: Send + Sync {
    fn get(&self, user: &str) -> Result<Option<Profile>>;

    fn set(&self, user: &str, profile: Profile) -> Result<()>;
}
