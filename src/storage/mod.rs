//! # Storage Module - Key-Value Persistence Layer
//!
//! Every record the application keeps (user profiles, character rosters, party
//! snapshots, the campaign book, the logged-in session) is a JSON document stored
//! under a string key. The rest of the crate only ever talks to the
//! [`KeyValueStore`] trait, so the backend is injected by the caller:
//!
//! - [`SledStore`] - on-disk sled tree, flushed after every write
//! - [`MemoryStore`] - in-process map, used by tests and dry runs
//!
//! ## Key Layout
//!
//! ```text
//! session:user          ← username of the logged-in user
//! users:<name>          ← UserProfile
//! roster:<name>         ← Roster (all characters of one user)
//! snapshot:<name>       ← Character last published by that user
//! dice:<name>           ← recent roll history
//! campaigns             ← Vec<Campaign>
//! ```
//!
//! ## Consistency
//!
//! Writes are plain read-modify-write with last-write-wins semantics. There is no
//! locking or conflict detection between two processes editing the same key; the
//! later `set` simply replaces the earlier one.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use beyonder::storage::{keys, load_json, save_json, SledStore};
//! use beyonder::sheet::Character;
//!
//! fn main() -> Result<(), beyonder::sheet::SheetError> {
//!     let store = SledStore::open("./data/beyonder.db")?;
//!     let snapshot: Option<Character> = load_json(&store, &keys::snapshot("alice"))?;
//!     if let Some(character) = snapshot {
//!         save_json(&store, &keys::snapshot("alice-backup"), &character)?;
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::sheet::errors::SheetError;

const TREE_RECORDS: &str = "beyonder_records";

/// Key builders for every record type.
pub mod keys {
    pub const SESSION_USER: &str = "session:user";
    pub const CAMPAIGNS: &str = "campaigns";

    pub const USERS_PREFIX: &str = "users:";

    pub fn user(username: &str) -> String {
        format!("{}{}", USERS_PREFIX, username.to_ascii_lowercase())
    }

    pub fn roster(username: &str) -> String {
        format!("roster:{}", username.to_ascii_lowercase())
    }

    /// Published copy of a user's active character, read by campaign invites and syncs.
    pub fn snapshot(username: &str) -> String {
        format!("snapshot:{}", username.to_ascii_lowercase())
    }

    pub fn dice_history(username: &str) -> String {
        format!("dice:{}", username.to_ascii_lowercase())
    }
}

/// Opaque string-keyed store holding JSON documents.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SheetError>;

    /// Insert or replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), SheetError>;

    /// Remove `key`, returning whether it was present.
    fn remove(&self, key: &str) -> Result<bool, SheetError>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SheetError>;
}

/// Read and decode a JSON record. A missing key yields `Ok(None)`.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>, SheetError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and write it under `key`.
pub fn save_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), SheetError>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    debug!("store set {} ({} bytes)", key, raw.len());
    store.set(key, &raw)
}

/// In-memory store. Contents vanish when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A panic while holding the lock cannot leave a half-written String behind.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SheetError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SheetError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, SheetError> {
        Ok(self.entries().remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SheetError> {
        Ok(self
            .entries()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// Sled-backed persistence for all records.
pub struct SledStore {
    _db: sled::Db,
    records: sled::Tree,
}

impl SledStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SheetError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, SheetError> {
        let records = db.open_tree(TREE_RECORDS)?;
        Ok(Self { _db: db, records })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, SheetError> {
        let Some(bytes) = self.records.get(key.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(String::from_utf8(bytes.to_vec())?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SheetError> {
        self.records.insert(key.as_bytes(), value.as_bytes())?;
        self.records.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, SheetError> {
        let existed = self.records.remove(key.as_bytes())?.is_some();
        self.records.flush()?;
        Ok(existed)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SheetError> {
        let mut keys = Vec::new();
        for entry in self.records.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_prefix_scan_is_ordered_and_bounded() {
        let store = MemoryStore::new();
        store.set("users:bob", "{}").unwrap();
        store.set("users:alice", "{}").unwrap();
        store.set("usersx", "{}").unwrap();
        store.set("roster:alice", "{}").unwrap();
        assert_eq!(
            store.keys_with_prefix("users:").unwrap(),
            vec!["users:alice".to_string(), "users:bob".to_string()]
        );
    }

    #[test]
    fn sled_prefix_scan_matches_memory_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SledStore::open(tmp.path()).unwrap();
        store.set("users:bob", "{}").unwrap();
        store.set("users:alice", "{}").unwrap();
        store.set("usersx", "{}").unwrap();
        store.set("roster:alice", "{}").unwrap();
        assert_eq!(
            store.keys_with_prefix(keys::USERS_PREFIX).unwrap(),
            vec!["users:alice".to_string(), "users:bob".to_string()]
        );
        assert!(store.keys_with_prefix("campaigns").unwrap().is_empty());
    }

    #[test]
    fn last_write_wins() {
        let store = MemoryStore::new();
        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
    }

    #[test]
    fn keys_are_case_insensitive_on_username() {
        assert_eq!(keys::roster("Alice"), keys::roster("alice"));
        assert_eq!(keys::user("BOB"), "users:bob");
    }
}
