//! Inspect or clear the saved chat history.
use anyhow::Result;
use zuschat_core::commands::CommandRouter;
use zuschat_core::message::{ChatMessage, Role};
use zuschat_core::storage::{ChatStorage, StateStore};

use crate::cli::ux::{ChatMessageType, render_message, style_chat_text};

/// Renders a saved message as the markup the web client would show.
fn render_html(router: &CommandRouter, message: &ChatMessage) -> String {
    let role = match message.role {
        Role::User => "user",
        Role::Agent => "agent",
    };
    format!(
        "<div class=\"message {role}\" data-time=\"{}\">{}</div>",
        message.timestamp,
        router.format_message(message.content.as_str())
    )
}

fn history_lines<S: StateStore>(storage: &ChatStorage<S>, html: bool) -> Vec<String> {
    let Some(saved) = storage.load_state() else {
        return Vec::new();
    };
    let router = CommandRouter::new();
    saved
        .messages
        .iter()
        .map(|message| {
            if html {
                render_html(&router, message)
            } else {
                render_message(message)
            }
        })
        .collect()
}

/// Executes the history command. `clear` wins over `info`.
pub fn execute<S: StateStore>(
    storage: &ChatStorage<S>,
    html: bool,
    info: bool,
    clear: bool,
) -> Result<()> {
    if clear {
        storage.clear_state();
        println!("Chat history cleared.");
        return Ok(());
    }

    if info {
        println!("{}", serde_json::to_string_pretty(&storage.get_storage_info())?);
        return Ok(());
    }

    let lines = history_lines(storage, html);
    if lines.is_empty() {
        eprintln!(
            "{}",
            style_chat_text("No saved chat history.", ChatMessageType::Footer)
        );
        return Ok(());
    }
    for line in lines {
        println!("{line}\n");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zuschat_core::storage::{FileStore, MemoryStore};

    fn saved_storage() -> ChatStorage<MemoryStore> {
        let storage = ChatStorage::new(MemoryStore::new());
        let mut reply = ChatMessage::agent("See https://zuscoffee.com/outlets\nfor details");
        reply.timestamp = "14:05".to_string();
        assert!(storage.save_state(&[ChatMessage::user("where?"), reply], Some("sess-9")));
        storage
    }

    #[test]
    fn test_history_html_rendering() {
        let lines = history_lines(&saved_storage(), true);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("<div class=\"message user\""));
        assert!(lines[1].starts_with("<div class=\"message agent\" data-time=\"14:05\">See <a href=\"https://zuscoffee.com/outlets\""));
        assert!(lines[1].ends_with("https://zuscoffee.com/outlets</a><br>for details</div>"));
    }

    #[test]
    fn test_history_plain_rendering() {
        let lines = history_lines(&saved_storage(), false);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("for details"));
    }

    #[test]
    fn test_history_empty_store() {
        let storage = ChatStorage::new(MemoryStore::new());
        assert!(history_lines(&storage, false).is_empty());
        execute(&storage, false, false, false).unwrap();
    }

    #[test]
    fn test_history_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ChatStorage::new(FileStore::new(dir.path()));
        storage.save_state(&[ChatMessage::user("hello")], None);
        assert!(storage.has_state());

        execute(&storage, false, true, true).unwrap();
        assert!(!storage.has_state());
    }
}
