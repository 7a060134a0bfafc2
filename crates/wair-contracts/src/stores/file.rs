use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use super::{ChatStore, InventoryStore, ProfileStore};
use crate::chat::{ChatMessage, ChatSession};
use crate::profile::Profile;
use crate::wardrobe::WardrobeItem;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserDocument {
    wardrobe: Vec<WardrobeItem>,
    chats: Vec<ChatSession>,
    messages: BTreeMap<String, Vec<ChatMessage>>,
    profile: Option<Profile>,
}

struct InventorySubscriber {
    user: String,
    sender: Sender<Vec<WardrobeItem>>,
}

struct MessageSubscriber {
    user: String,
    session_id: String,
    sender: Sender<Vec<ChatMessage>>,
}

/// One pretty-printed JSON document per user under `root`.
///
/// Every write re-reads the document from disk before applying the change, so
/// two store instances pointed at the same directory do not clobber each
/// other's unrelated edits.
pub struct JsonFileStore {
    root: PathBuf,
    lock: Mutex<()>,
    inventory_subscribers: Mutex<Vec<InventorySubscriber>>,
    message_subscribers: Mutex<Vec<MessageSubscriber>>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
            inventory_subscribers: Mutex::new(Vec::new()),
            message_subscribers: Mutex::new(Vec::new()),
        }
    }

    fn user_path(&self, user: &str) -> PathBuf {
        let safe = user
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect::<String>();
        self.root.join(format!("{safe}.json"))
    }

    fn read(&self, user: &str) -> Result<UserDocument> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        read_document(&self.user_path(user))
    }

    fn update<T>(&self, user: &str, apply: impl FnOnce(&mut UserDocument) -> T) -> Result<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("store lock poisoned"))?;
        let path = self.user_path(user);
        let mut document = read_document(&path)?;
        let out = apply(&mut document);
        write_document(&path, &document)?;
        Ok(out)
    }

    fn notify_inventory(&self, user: &str) -> Result<()> {
        let snapshot = self.list(user)?;
        let mut subscribers = self
            .inventory_subscribers
            .lock()
            .map_err(|_| anyhow!("subscriber lock poisoned"))?;
        subscribers.retain(|subscriber| {
            subscriber.user != user || subscriber.sender.send(snapshot.clone()).is_ok()
        });
        Ok(())
    }

    fn notify_messages(&self, user: &str, session_id: &str) -> Result<()> {
        let snapshot = self.list_messages(user, session_id)?;
        let mut subscribers = self
            .message_subscribers
            .lock()
            .map_err(|_| anyhow!("subscriber lock poisoned"))?;
        subscribers.retain(|subscriber| {
            subscriber.user != user
                || subscriber.session_id != session_id
                || subscriber.sender.send(snapshot.clone()).is_ok()
        });
        Ok(())
    }
}

impl InventoryStore for JsonFileStore {
    fn insert(&self, user: &str, item: WardrobeItem) -> Result<WardrobeItem> {
        let stored = item.clone();
        self.update(user, |document| {
            document.wardrobe.retain(|existing| existing.id() != stored.id());
            document.wardrobe.push(stored);
        })?;
        self.notify_inventory(user)?;
        Ok(item)
    }

    fn list(&self, user: &str) -> Result<Vec<WardrobeItem>> {
        let mut items = self.read(user)?.wardrobe;
        items.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(items)
    }

    fn delete(&self, user: &str, id: &str) -> Result<bool> {
        let removed = self.update(user, |document| {
            let before = document.wardrobe.len();
            document.wardrobe.retain(|item| item.id() != id);
            document.wardrobe.len() != before
        })?;
        if removed {
            self.notify_inventory(user)?;
        }
        Ok(removed)
    }

    fn subscribe(&self, user: &str) -> Receiver<Vec<WardrobeItem>> {
        let (sender, receiver) = channel();
        if let Ok(mut subscribers) = self.inventory_subscribers.lock() {
            subscribers.push(InventorySubscriber {
                user: user.to_string(),
                sender,
            });
        }
        receiver
    }
}

impl ChatStore for JsonFileStore {
    fn create_session(&self, user: &str) -> Result<ChatSession> {
        let session = ChatSession::new();
        let stored = session.clone();
        self.update(user, |document| document.chats.push(stored))?;
        Ok(session)
    }

    fn list_sessions(&self, user: &str) -> Result<Vec<ChatSession>> {
        let mut sessions = self.read(user)?.chats;
        sessions.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
        Ok(sessions)
    }

    fn get_session(&self, user: &str, session_id: &str) -> Result<Option<ChatSession>> {
        Ok(self
            .read(user)?
            .chats
            .into_iter()
            .find(|session| session.id == session_id))
    }

    fn delete_session(&self, user: &str, session_id: &str) -> Result<bool> {
        self.update(user, |document| {
            let before = document.chats.len();
            document.chats.retain(|session| session.id != session_id);
            document.messages.remove(session_id);
            document.chats.len() != before
        })
    }

    fn append_message(&self, user: &str, session_id: &str, message: ChatMessage) -> Result<()> {
        self.update(user, |document| {
            let session = document
                .chats
                .iter_mut()
                .find(|session| session.id == session_id)
                .with_context(|| format!("chat session not found: {session_id}"))?;
            let messages = document.messages.entry(session_id.to_string()).or_default();
            session.note_message(&message, messages.is_empty());
            messages.push(message);
            Ok::<(), anyhow::Error>(())
        })??;
        self.notify_messages(user, session_id)
    }

    fn list_messages(&self, user: &str, session_id: &str) -> Result<Vec<ChatMessage>> {
        let mut messages = self
            .read(user)?
            .messages
            .remove(session_id)
            .unwrap_or_default();
        messages.sort_by_key(|message| message.created_at);
        Ok(messages)
    }

    fn subscribe_messages(&self, user: &str, session_id: &str) -> Receiver<Vec<ChatMessage>> {
        let (sender, receiver) = channel();
        if let Ok(mut subscribers) = self.message_subscribers.lock() {
            subscribers.push(MessageSubscriber {
                user: user.to_string(),
                session_id: session_id.to_string(),
                sender,
            });
        }
        receiver
    }
}

impl ProfileStore for JsonFileStore {
    fn get(&self, user: &str) -> Result<Option<Profile>> {
        Ok(self.read(user)?.profile)
    }

    fn set(&self, user: &str, profile: Profile) -> Result<()> {
        self.update(user, |document| document.profile = Some(profile))
    }
}

fn read_document(path: &Path) -> Result<UserDocument> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(UserDocument::default())
        }
        Err(err) => return Err(err).with_context(|| format!("failed reading {}", path.display())),
    };
    if raw.trim().is_empty() {
        return Ok(UserDocument::default());
    }
    serde_json::from_str(&raw).with_context(|| format!("invalid store document {}", path.display()))
}

fn write_document(path: &Path, document: &UserDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(document)?)
        .with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::wardrobe::{Category, NewWardrobeItem};

    fn draft(color: &str, subcategory: &str, category: Category) -> NewWardrobeItem {
        NewWardrobeItem {
            category,
            subcategory: subcategory.to_string(),
            color: color.to_string(),
            material: None,
            formality: 5,
            image: String::new(),
            description: None,
        }
    }

    #[test]
    fn inventory_lists_newest_first() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = JsonFileStore::new(temp.path());
        let now = Utc::now();
        store.insert(
            "u1",
            WardrobeItem::new("old", draft("Black", "Heels", Category::Shoes), now - Duration::hours(1)),
        )?;
        store.insert(
            "u1",
            WardrobeItem::new("new", draft("Red", "Gown", Category::Dress), now),
        )?;

        let ids = store
            .list("u1")?
            .iter()
            .map(|item| item.id().to_string())
            .collect::<Vec<String>>();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(store.list("someone-else")?.is_empty());
        Ok(())
    }

    #[test]
    fn inventory_changes_are_pushed_to_subscribers() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = JsonFileStore::new(temp.path());
        let updates = store.subscribe("u1");

        let created = store.create("u1", draft("Blue", "Jeans", Category::Bottom))?;
        assert_eq!(updates.try_recv()?.len(), 1);

        assert!(store.delete("u1", created.id())?);
        assert!(updates.try_recv()?.is_empty());

        assert!(!store.delete("u1", "missing")?);
        assert!(updates.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn messages_are_ordered_and_removed_with_session() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = JsonFileStore::new(temp.path());
        let session = store.create_session("u1")?;
        let updates = store.subscribe_messages("u1", &session.id);

        let mut late = ChatMessage::assistant("second", Vec::new());
        late.created_at = Utc::now() + Duration::seconds(5);
        store.append_message("u1", &session.id, late)?;
        store.append_message("u1", &session.id, ChatMessage::user("first", None))?;

        let texts = store
            .list_messages("u1", &session.id)?
            .into_iter()
            .filter_map(|message| message.text)
            .collect::<Vec<String>>();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(updates.try_iter().count(), 2);

        assert!(store.delete_session("u1", &session.id)?);
        assert!(store.list_messages("u1", &session.id)?.is_empty());
        assert!(store.list_sessions("u1")?.is_empty());
        Ok(())
    }

    #[test]
    fn append_names_and_previews_the_session() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = JsonFileStore::new(temp.path());
        let session = store.create_session("u1")?;

        store.append_message("u1", &session.id, ChatMessage::user("Office party, smart casual", None))?;
        store.append_message("u1", &session.id, ChatMessage::assistant("z".repeat(70), Vec::new()))?;

        let stored = store.get_session("u1", &session.id)?;
        assert_eq!(stored.as_ref().map(|s| s.title.as_str()), Some("Office party, smart casual"));
        assert_eq!(
            stored.and_then(|s| s.last_message),
            Some(format!("{}...", "z".repeat(50)))
        );

        let orphan = store.append_message("u1", "missing", ChatMessage::user("hi", None));
        assert!(orphan.is_err());
        assert!(store.list_messages("u1", "missing")?.is_empty());
        Ok(())
    }

    #[test]
    fn concurrent_appends_keep_every_message_and_the_title() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = std::sync::Arc::new(JsonFileStore::new(temp.path()));
        let session = store.create_session("u1")?;
        store.append_message("u1", &session.id, ChatMessage::user("Wedding guest look", None))?;

        let handles = (0..8)
            .map(|idx| {
                let store = store.clone();
                let id = session.id.clone();
                std::thread::spawn(move || {
                    store.append_message("u1", &id, ChatMessage::assistant(format!("reply {idx}"), Vec::new()))
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("append thread panicked"))??;
        }

        assert_eq!(store.list_messages("u1", &session.id)?.len(), 9);
        let stored = store.get_session("u1", &session.id)?;
        assert_eq!(stored.as_ref().map(|s| s.title.as_str()), Some("Wedding guest look"));
        let preview = stored.and_then(|s| s.last_message).unwrap_or_default();
        assert!(preview.starts_with("reply "), "{preview}");
        Ok(())
    }

    #[test]
    fn two_instances_merge_writes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store_a = JsonFileStore::new(temp.path());
        let store_b = JsonFileStore::new(temp.path());

        store_a.create("u1", draft("Grey", "Blazer", Category::Outerwear))?;
        let mut profile = Profile::default();
        profile.add_photo("data:image/jpeg;base64,AA".to_string());
        store_b.set("u1", profile.clone())?;

        assert_eq!(store_a.get("u1")?, Some(profile));
        assert_eq!(store_b.list("u1")?.len(), 1);
        Ok(())
    }
}
