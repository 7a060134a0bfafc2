use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use wair_contracts::chat::{ChatMessage, ChatSession};
use wair_contracts::stores::{ChatStore, InventoryStore, JsonFileStore, ProfileStore};
use wair_contracts::{NewWardrobeItem, Profile, WardrobeItem};

use crate::demo;

/// Everything a user action reads or writes, shared by reference across the
/// threads that run those actions.
#[derive(Clone)]
pub struct AppState {
    user: String,
    inventory: Arc<dyn InventoryStore>,
    chats: Arc<dyn ChatStore>,
    profiles: Arc<dyn ProfileStore>,
    online: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        user: impl Into<String>,
        inventory: Arc<dyn InventoryStore>,
        chats: Arc<dyn ChatStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            user: user.into(),
            inventory,
            chats,
            profiles,
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// All three collaborators backed by one file store.
    pub fn with_file_store(user: impl Into<String>, store: JsonFileStore) -> Self {
        let store = Arc::new(store);
        Self::new(user, store.clone(), store.clone(), store)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn wardrobe(&self) -> Result<Vec<WardrobeItem>> {
        self.inventory.list(&self.user)
    }

    pub fn profile(&self) -> Result<Profile> {
        Ok(self.profiles.get(&self.user)?.unwrap_or_default())
    }

    pub fn sessions(&self) -> Result<Vec<ChatSession>> {
        self.chats.list_sessions(&self.user)
    }

    pub fn session(&self, session_id: &str) -> Result<ChatSession> {
        self.chats
            .get_session(&self.user, session_id)?
            .with_context(|| format!("chat session not found: {session_id}"))
    }

    pub fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        self.chats.list_messages(&self.user, session_id)
    }

    pub fn add_item(&self, draft: NewWardrobeItem) -> Result<WardrobeItem> {
        let item = self.inventory.create(&self.user, draft)?;
        tracing::info!(item = item.id(), label = %item.label(), "wardrobe item added");
        Ok(item)
    }

    pub fn delete_item(&self, id: &str) -> Result<bool> {
        self.inventory.delete(&self.user, id)
    }

    /// First-run defaults: demo wardrobe when the inventory is empty and the
    /// demo profile when none was ever saved.
    pub fn ensure_defaults(&self) -> Result<()> {
        self.seed_if_empty()?;
        if self.profiles.get(&self.user)?.is_none() {
            self.profiles.set(&self.user, demo::demo_profile())?;
            tracing::info!("demo profile created");
        }
        Ok(())
    }

    /// Seeds the demo wardrobe when the inventory is empty. Returns how many
    /// items were written.
    pub fn seed_if_empty(&self) -> Result<usize> {
        if !self.wardrobe()?.is_empty() {
            return Ok(0);
        }
        self.seed_demo()
    }

    pub fn seed_demo(&self) -> Result<usize> {
        let items = demo::demo_wardrobe();
        let count = items.len();
        for item in items {
            self.inventory.insert(&self.user, item)?;
        }
        tracing::info!(count, "demo wardrobe seeded");
        Ok(count)
    }

    /// Deletes every item, then seeds the demo wardrobe again.
    pub fn reset_wardrobe(&self) -> Result<usize> {
        for item in self.wardrobe()? {
            self.inventory.delete(&self.user, item.id())?;
        }
        self.seed_demo()
    }

    pub fn update_profile(&self, profile: Profile) -> Result<()> {
        self.profiles.set(&self.user, profile)
    }

    pub fn create_chat(&self) -> Result<ChatSession> {
        self.chats.create_session(&self.user)
    }

    pub fn delete_chat(&self, session_id: &str) -> Result<bool> {
        self.chats.delete_session(&self.user, session_id)
    }

    /// Appends `message`; the store refreshes the session's title and
    /// preview in the same write.
    pub fn append_message(&self, session_id: &str, message: ChatMessage) -> Result<()> {
        self.chats.append_message(&self.user, session_id, message)
    }
}
