//! Chat messages as shown in the conversation and stored on disk.
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Offset of the wall clock message timestamps are rendered in (UTC+8).
const TIMESTAMP_OFFSET_SECS: i32 = 8 * 60 * 60;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Agent,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub search_info: Option<Value>,
    /// Creation time as `HH:MM` in UTC+8.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products_found: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlets_found: Option<u64>,
    /// Diagnostic payload from the backend planner. Never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning_info: Option<Value>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: current_timestamp(),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }
}

/// Formats `now` as `HH:MM` on the UTC+8 wall clock.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(TIMESTAMP_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).format("%H:%M").to_string(),
        None => now.format("%H:%M").to_string(),
    }
}

pub fn current_timestamp() -> String {
    format_timestamp(Utc::now())
}
