//! Slash commands: registry, suggestion filtering, keyboard navigation and
//! execution.
//!
//! Executing a command never touches caller state. It returns the list of
//! [`Effect`]s the host applies, see [`crate::view::ChatView::apply`].
use crate::api::Stats;
use crate::format::format_message;
use crate::message::ChatMessage;
use crate::view::ChatView;

pub const CLEAR_CONFIRMATION: &str = "Chat cleared! 🧹 How can I help you?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Products,
    Outlets,
    Calculate,
    Count,
    Maps,
    Help,
    Stats,
    Clear,
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub kind: CommandKind,
    /// Command literal including the leading `/`.
    pub command: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

static REGISTRY: [CommandSpec; 8] = [
    CommandSpec {
        kind: CommandKind::Products,
        command: "/products",
        description: "Search drinkware products",
        example: "What tumblers do you have?",
    },
    CommandSpec {
        kind: CommandKind::Outlets,
        command: "/outlets",
        description: "Find outlet locations",
        example: "Show outlets in Shah Alam",
    },
    CommandSpec {
        kind: CommandKind::Calculate,
        command: "/calculate",
        description: "Perform calculations",
        example: "What is 5 + 3?",
    },
    CommandSpec {
        kind: CommandKind::Count,
        command: "/count",
        description: "Count outlets by location",
        example: "How many outlets in KL?",
    },
    CommandSpec {
        kind: CommandKind::Maps,
        command: "/maps",
        description: "Get outlet map links",
        example: "Give me maps for Subang outlets",
    },
    CommandSpec {
        kind: CommandKind::Help,
        command: "/help",
        description: "Show available commands",
        example: "What can you do?",
    },
    CommandSpec {
        kind: CommandKind::Stats,
        command: "/stats",
        description: "Show database statistics",
        example: "How many products?",
    },
    CommandSpec {
        kind: CommandKind::Clear,
        command: "/clear",
        description: "Clear chat history",
        example: "",
    },
];

impl CommandKind {
    pub fn spec(self) -> &'static CommandSpec {
        let index = match self {
            CommandKind::Products => 0,
            CommandKind::Outlets => 1,
            CommandKind::Calculate => 2,
            CommandKind::Count => 3,
            CommandKind::Maps => 4,
            CommandKind::Help => 5,
            CommandKind::Stats => 6,
            CommandKind::Clear => 7,
        };
        &REGISTRY[index]
    }

    pub fn command(self) -> &'static str {
        self.spec().command
    }

    /// Whether selecting the command acts immediately instead of rewriting the input.
    pub fn runs_locally(self) -> bool {
        matches!(
            self,
            CommandKind::Help | CommandKind::Stats | CommandKind::Clear
        )
    }

    /// Looks up a command by its literal, ignoring case.
    pub fn from_command(literal: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|spec| spec.command.eq_ignore_ascii_case(literal))
            .map(|spec| spec.kind)
    }
}

/// One change to the chat view, or a host action, requested by a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ClearMessages,
    AppendMessage(ChatMessage),
    ResetSession,
    ClearStorage,
    SetInput(String),
    HideSuggestions,
    ScrollToBottom,
    FocusInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn delta(self) -> isize {
        match self {
            Direction::Up => -1,
            Direction::Down => 1,
        }
    }
}

/// What a key press resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Select(CommandKind),
    Send,
    Nothing,
}

/// Inputs a command may read while executing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandContext<'a> {
    pub input: &'a str,
    pub stats: Option<&'a Stats>,
}

#[derive(Debug, Clone)]
pub struct CommandRouter {
    commands: &'static [CommandSpec],
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRouter {
    pub fn new() -> Self {
        Self {
            commands: &REGISTRY,
        }
    }

    /// All registered commands in registry order.
    pub fn commands(&self) -> &'static [CommandSpec] {
        self.commands
    }

    /// Suggestions for the current input.
    ///
    /// `/` alone lists everything, other `/`-prefixed input matches command
    /// prefixes case-insensitively, anything else yields nothing.
    pub fn filter_commands(&self, input: &str) -> Vec<&'static CommandSpec> {
        if input == "/" {
            return self.commands.iter().collect();
        }
        if !input.starts_with('/') {
            return Vec::new();
        }

        let needle = input.to_lowercase();
        self.commands
            .iter()
            .filter(|spec| spec.command.to_lowercase().starts_with(&needle))
            .collect()
    }

    pub fn should_show_commands(&self, input: &str) -> bool {
        input.starts_with('/')
    }

    /// Moves the highlighted suggestion one step, wrapping at both ends.
    pub fn navigate_commands<T>(
        &self,
        current: usize,
        direction: Direction,
        filtered: &[T],
    ) -> usize {
        if filtered.is_empty() {
            return current;
        }

        let next = current as isize + direction.delta();
        if next < 0 {
            filtered.len() - 1
        } else if next as usize >= filtered.len() {
            0
        } else {
            next as usize
        }
    }

    /// Enter picks the highlighted suggestion when the panel shows one, otherwise sends.
    pub fn handle_enter(&self, view: &ChatView) -> KeyAction {
        match highlighted(view) {
            Some(kind) => KeyAction::Select(kind),
            None => KeyAction::Send,
        }
    }

    /// Tab picks the highlighted suggestion when the panel shows one.
    pub fn handle_tab(&self, view: &ChatView) -> KeyAction {
        match highlighted(view) {
            Some(kind) => KeyAction::Select(kind),
            None => KeyAction::Nothing,
        }
    }

    /// Executes a command and returns the effects to apply.
    pub fn select_command(&self, kind: CommandKind, ctx: &CommandContext<'_>) -> Vec<Effect> {
        match kind {
            CommandKind::Clear => self.execute_clear(),
            CommandKind::Help => self.execute_help(),
            CommandKind::Stats => self.execute_stats(ctx.stats),
            CommandKind::Products
            | CommandKind::Outlets
            | CommandKind::Calculate
            | CommandKind::Count
            | CommandKind::Maps => self.execute_insert(kind, ctx.input),
        }
    }

    fn execute_clear(&self) -> Vec<Effect> {
        vec![
            Effect::ClearMessages,
            Effect::AppendMessage(ChatMessage::agent(CLEAR_CONFIRMATION)),
            Effect::ResetSession,
            Effect::ClearStorage,
            Effect::SetInput(String::new()),
            Effect::HideSuggestions,
        ]
    }

    fn execute_help(&self) -> Vec<Effect> {
        vec![
            Effect::AppendMessage(ChatMessage::agent(self.help_text())),
            Effect::ScrollToBottom,
            Effect::SetInput(String::new()),
            Effect::HideSuggestions,
        ]
    }

    fn execute_stats(&self, stats: Option<&Stats>) -> Vec<Effect> {
        vec![
            Effect::AppendMessage(ChatMessage::agent(self.stats_text(stats))),
            Effect::ScrollToBottom,
            Effect::SetInput(String::new()),
            Effect::HideSuggestions,
        ]
    }

    fn execute_insert(&self, kind: CommandKind, input: &str) -> Vec<Effect> {
        vec![
            Effect::SetInput(self.build_command_string(kind, input)),
            Effect::HideSuggestions,
            Effect::FocusInput,
        ]
    }

    /// Replaces any leading `/word` token of `current_input` with the command.
    pub fn build_command_string(&self, kind: CommandKind, current_input: &str) -> String {
        let question = strip_command_token(current_input).trim();
        if question.is_empty() {
            format!("{} ", kind.command())
        } else {
            format!("{} {}", kind.command(), question)
        }
    }

    pub fn help_text(&self) -> String {
        let lines: Vec<String> = self
            .commands
            .iter()
            .map(|spec| format!("{} - {}", spec.command, spec.description))
            .collect();
        format!("Available commands:\n\n{}", lines.join("\n"))
    }

    /// Summary shown by `/stats`. Missing counts read as 0 and missing regions as N/A.
    pub fn stats_text(&self, stats: Option<&Stats>) -> String {
        let products = stats.and_then(|s| s.total_products).unwrap_or(0);
        let outlets = stats.and_then(|s| s.total_outlets).unwrap_or(0);
        let regions = stats
            .and_then(|s| s.regions.as_ref())
            .map(|regions| regions.join(", "))
            .filter(|joined| !joined.is_empty())
            .unwrap_or_else(|| "N/A".to_string());

        format!(
            "📊 Database Stats:\n• {products} drinkware products\n• {outlets} outlets\n• Regions: {regions}"
        )
    }

    pub fn format_message<'a>(&self, text: impl Into<Option<&'a str>>) -> String {
        format_message(text)
    }
}

fn highlighted(view: &ChatView) -> Option<CommandKind> {
    if !view.show_commands || view.filtered.is_empty() {
        return None;
    }
    view.filtered.get(view.selected_index).copied()
}

fn strip_command_token(input: &str) -> &str {
    match input.strip_prefix('/') {
        Some(rest) => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        None => input,
    }
}
