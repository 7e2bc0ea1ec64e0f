//! Best-effort persistence of the chat window and session id.
//!
//! [`ChatStorage`] never reports failures to its caller: saves return `false`
//! and unreadable state loads as "nothing saved".
use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::StorageConfig;
use crate::message::{ChatMessage, Role};
use crate::view::ViewHooks;

pub const STORAGE_KEY: &str = "zus-chat-state";
pub const STATE_VERSION: &str = "1.0";
pub const MAX_STORED_MESSAGES: usize = 50;
/// Saved state older than this is discarded on load.
pub const EXPIRY_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded: {size} bytes requested, {quota} allowed")]
    QuotaExceeded { size: usize, quota: usize },
    #[error("File system error: {0}")]
    IO(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A string key/value store holding serialized state.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn check_quota(quota: Option<usize>, value: &str) -> Result<(), StorageError> {
    match quota {
        Some(quota) if value.len() > quota => Err(StorageError::QuotaExceeded {
            size: value.len(),
            quota,
        }),
        _ => Ok(()),
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Default::default()
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota_bytes, value)?;
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes: None,
        }
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn from_config(config: &StorageConfig) -> io::Result<Self> {
        Ok(Self::new(config.resolve_dir()?).with_quota(config.quota_bytes))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota_bytes, value)?;
        fs::create_dir_all(&self.dir)?;

        // Write to a sibling file first so readers never see a partial blob
        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{key}.json.tmp"));
        let written = fs::write(&tmp_path, value).and_then(|_| fs::rename(&tmp_path, &path));
        match written {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                if e.kind() == ErrorKind::StorageFull {
                    Err(StorageError::QuotaExceeded {
                        size: value.len(),
                        quota: self.quota_bytes.unwrap_or(0),
                    })
                } else {
                    Err(e.into())
                }
            }
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A message as persisted, without the planning payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct StoredMessage {
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    search_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    products_found: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outlets_found: Option<u64>,
}

impl From<&ChatMessage> for StoredMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            timestamp: msg.timestamp.clone(),
            search_info: msg.search_info.clone(),
            products_found: msg.products_found,
            outlets_found: msg.outlets_found,
        }
    }
}

impl From<StoredMessage> for ChatMessage {
    fn from(msg: StoredMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content,
            search_info: msg.search_info,
            timestamp: msg.timestamp,
            products_found: msg.products_found,
            outlets_found: msg.outlets_found,
            planning_info: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct PersistedState {
    #[serde(default)]
    messages: Option<Vec<StoredMessage>>,
    #[serde(default, rename = "sessionId")]
    session_id: Option<String>,
    /// Save time in epoch milliseconds.
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    version: Option<String>,
}

/// State restored by [`ChatStorage::load_state`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavedChat {
    pub messages: Vec<ChatMessage>,
    pub session_id: Option<String>,
}

/// Debug summary of the persisted entry.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct StorageInfo {
    pub exists: bool,
    pub size: usize,
    pub message_count: usize,
    pub saved_at: Option<String>,
    pub age_ms: Option<i64>,
    pub error: Option<String>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug)]
pub struct ChatStorage<S: StateStore> {
    store: S,
}

impl<S: StateStore> ChatStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists the last 50 messages and the session id. Returns whether the write succeeded.
    pub fn save_state(&self, messages: &[ChatMessage], session_id: Option<&str>) -> bool {
        let start = messages.len().saturating_sub(MAX_STORED_MESSAGES);
        let state = PersistedState {
            messages: Some(messages[start..].iter().map(StoredMessage::from).collect()),
            session_id: session_id.map(str::to_string),
            timestamp: Some(now_millis()),
            version: Some(STATE_VERSION.to_string()),
        };

        let result = serde_json::to_string(&state)
            .map_err(StorageError::from)
            .and_then(|blob| self.store.set(STORAGE_KEY, &blob));

        match result {
            Ok(()) => {
                debug!("Saved {} messages", messages.len() - start);
                true
            }
            Err(StorageError::QuotaExceeded { size, quota }) => {
                error!("Failed to save chat state: {size} bytes exceeds quota of {quota}");
                warn!("Storage quota exceeded, clearing old data");
                self.clear_state();
                false
            }
            Err(e) => {
                error!("Failed to save chat state: {e}");
                false
            }
        }
    }

    /// Restores saved state. Missing, expired or unreadable state yields `None`;
    /// the latter two are also removed.
    pub fn load_state(&self) -> Option<SavedChat> {
        let blob = match self.store.get(STORAGE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                error!("Failed to load chat state: {e}");
                self.clear_state();
                return None;
            }
        };

        let state: PersistedState = match serde_json::from_str(&blob) {
            Ok(state) => state,
            Err(e) => {
                error!("Failed to load chat state: {e}");
                self.clear_state();
                return None;
            }
        };

        if let Some(saved_at) = state.timestamp.filter(|ts| *ts != 0) {
            if now_millis() - saved_at > EXPIRY_MS {
                info!("Chat history expired (>7 days), clearing");
                self.clear_state();
                return None;
            }
        }

        let messages: Vec<ChatMessage> = state
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(ChatMessage::from)
            .collect();
        info!("Restored {} messages from storage", messages.len());

        Some(SavedChat {
            messages,
            session_id: state.session_id.filter(|id| !id.is_empty()),
        })
    }

    pub fn clear_state(&self) {
        if let Err(e) = self.store.remove(STORAGE_KEY) {
            error!("Failed to clear chat state: {e}");
        }
    }

    pub fn has_state(&self) -> bool {
        match self.store.get(STORAGE_KEY) {
            Ok(blob) => blob.is_some(),
            Err(e) => {
                warn!("Failed to read chat state: {e}");
                false
            }
        }
    }

    /// Size, message count and age of the saved entry, for debugging.
    pub fn get_storage_info(&self) -> StorageInfo {
        let blob = match self.store.get(STORAGE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return StorageInfo::default(),
            Err(e) => {
                return StorageInfo {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let size = blob.len();
        let value: Value = match serde_json::from_str(&blob) {
            Ok(value) => value,
            Err(e) => {
                return StorageInfo {
                    exists: true,
                    size,
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let message_count = value
            .get("messages")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let timestamp = value.get("timestamp").and_then(Value::as_i64);
        let saved_at = timestamp
            .and_then(|ts| Local.timestamp_millis_opt(ts).single())
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string());

        StorageInfo {
            exists: true,
            size,
            message_count,
            saved_at,
            age_ms: timestamp.map(|ts| now_millis() - ts),
            error: None,
        }
    }
}

impl<S: StateStore> ViewHooks for ChatStorage<S> {
    fn clear_storage(&mut self) {
        self.clear_state();
    }
}
