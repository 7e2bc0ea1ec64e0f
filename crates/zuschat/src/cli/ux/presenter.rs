use console::{Style, StyledObject};
use zuschat_core::message::{ChatMessage, Role};

/// Represents the type of a chat message, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMessageType {
    /// The prompt for user input.
    Prompt,
    User,
    Agent,
    /// Footer information, like timestamps or result counts.
    Footer,
    /// An error message.
    Error,
}

/// Styles a string of text according to the specified `ChatMessageType`.
pub fn style_chat_text(text: &str, style: ChatMessageType) -> StyledObject<&str> {
    let style_obj = match style {
        ChatMessageType::Prompt => Style::new().blue().bold(),
        ChatMessageType::User => Style::new().blue(),
        ChatMessageType::Agent => Style::new().white().bright(),
        ChatMessageType::Footer => Style::new().white().dim(),
        ChatMessageType::Error => Style::new().red().bold(),
    };
    style_obj.apply_to(text)
}

/// Footer line under an agent message: time and result counts.
pub fn format_message_footer(message: &ChatMessage) -> String {
    let mut details = Vec::new();
    if !message.timestamp.is_empty() {
        details.push(message.timestamp.clone());
    }
    if let Some(products) = message.products_found.filter(|n| *n > 0) {
        details.push(format!("{products} products found"));
    }
    if let Some(outlets) = message.outlets_found.filter(|n| *n > 0) {
        details.push(format!("{outlets} outlets found"));
    }
    format!("◼ {}", details.join(" · "))
}

/// Renders a message for the terminal.
pub fn render_message(message: &ChatMessage) -> String {
    match message.role {
        Role::User => {
            let stamp = if message.timestamp.is_empty() {
                String::new()
            } else {
                format!("[{}] ", message.timestamp)
            };
            format!(
                "{}{}",
                style_chat_text(&stamp, ChatMessageType::Footer),
                style_chat_text(&message.content, ChatMessageType::User)
            )
        }
        Role::Agent => {
            let footer = format_message_footer(message);
            format!(
                "{}\n{}",
                style_chat_text(&message.content, ChatMessageType::Agent),
                style_chat_text(&footer, ChatMessageType::Footer)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_styles() {
        let styled = style_chat_text("test", ChatMessageType::Error);
        assert_eq!(
            styled.force_styling(true).to_string(),
            "\u{1b}[31m\u{1b}[1mtest\u{1b}[0m"
        );
    }

    #[test]
    fn test_format_message_footer() {
        let message = ChatMessage {
            content: "Found some".to_string(),
            timestamp: "14:02".to_string(),
            products_found: Some(3),
            outlets_found: Some(0),
            ..Default::default()
        };
        assert_eq!(format_message_footer(&message), "◼ 14:02 · 3 products found");

        let message = ChatMessage {
            timestamp: "09:15".to_string(),
            outlets_found: Some(12),
            ..Default::default()
        };
        assert_eq!(format_message_footer(&message), "◼ 09:15 · 12 outlets found");
    }

    #[test]
    fn test_render_message_contains_content() {
        let user = ChatMessage {
            role: Role::User,
            content: "hello there".to_string(),
            timestamp: "10:00".to_string(),
            ..Default::default()
        };
        let rendered = render_message(&user);
        assert!(rendered.contains("hello there"));
        assert!(rendered.contains("[10:00]"));

        let agent = ChatMessage::agent("hi!");
        let rendered = render_message(&agent);
        assert!(rendered.contains("hi!"));
        assert!(rendered.contains("◼"));
    }
}
