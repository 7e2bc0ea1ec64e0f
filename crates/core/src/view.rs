//! UI state of a chat screen, owned by the host application.
use crate::commands::{CommandKind, CommandRouter, Direction, Effect};
use crate::message::ChatMessage;

/// Host side actions a command can request. Every hook defaults to a no-op.
pub trait ViewHooks {
    fn clear_storage(&mut self) {}
    fn scroll_to_bottom(&mut self) {}
    fn focus_input(&mut self) {}
}

impl ViewHooks for () {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatView {
    pub messages: Vec<ChatMessage>,
    pub session_id: Option<String>,
    pub input: String,
    pub show_commands: bool,
    /// Suggestions for the current input, in registry order.
    pub filtered: Vec<CommandKind>,
    pub selected_index: usize,
}

impl ChatView {
    pub fn new(messages: Vec<ChatMessage>, session_id: Option<String>) -> Self {
        Self {
            messages,
            session_id,
            ..Default::default()
        }
    }

    /// Replaces the input text and recomputes the suggestion panel.
    pub fn set_input(&mut self, router: &CommandRouter, input: &str) {
        self.input = input.to_string();
        self.show_commands = router.should_show_commands(input);
        self.filtered = router
            .filter_commands(input)
            .into_iter()
            .map(|spec| spec.kind)
            .collect();
        self.selected_index = 0;
    }

    pub fn navigate(&mut self, router: &CommandRouter, direction: Direction) {
        self.selected_index =
            router.navigate_commands(self.selected_index, direction, &self.filtered);
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Applies command effects in order, forwarding host actions to `hooks`.
    pub fn apply<H: ViewHooks + ?Sized>(&mut self, effects: Vec<Effect>, hooks: &mut H) {
        for effect in effects {
            match effect {
                Effect::ClearMessages => self.messages.clear(),
                Effect::AppendMessage(message) => self.messages.push(message),
                Effect::ResetSession => self.session_id = None,
                Effect::ClearStorage => hooks.clear_storage(),
                Effect::SetInput(input) => self.input = input,
                Effect::HideSuggestions => self.show_commands = false,
                Effect::ScrollToBottom => hooks.scroll_to_bottom(),
                Effect::FocusInput => hooks.focus_input(),
            }
        }
    }
}
