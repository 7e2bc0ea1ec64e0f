//! The chat screen: owns the services and the view, and turns submitted lines
//! into commands or backend requests.
use tracing::{debug, warn};
use zuschat_core::api::{ApiClient, ApiResponse, Stats};
use zuschat_core::commands::{CommandContext, CommandKind, CommandRouter, KeyAction};
use zuschat_core::message::ChatMessage;
use zuschat_core::storage::{ChatStorage, StateStore};
use zuschat_core::view::{ChatView, ViewHooks};

/// What the REPL should do after a line was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Messages from this index onwards are new and should be printed.
    Messages(usize),
    /// Pre-fill the next prompt with this text.
    Prefill(String),
    Ignored,
}

/// Forwards command side effects to the terminal host.
struct ReplHooks<'a, S: StateStore> {
    storage: &'a ChatStorage<S>,
    focus_requested: bool,
}

impl<S: StateStore> ViewHooks for ReplHooks<'_, S> {
    fn clear_storage(&mut self) {
        self.storage.clear_state();
    }

    fn focus_input(&mut self) {
        self.focus_requested = true;
    }
}

pub struct ChatApp<S: StateStore> {
    api: ApiClient,
    router: CommandRouter,
    storage: ChatStorage<S>,
    view: ChatView,
    stats: Option<Stats>,
}

impl<S: StateStore> ChatApp<S> {
    pub fn new(api: ApiClient, router: CommandRouter, storage: ChatStorage<S>) -> Self {
        Self {
            api,
            router,
            storage,
            view: ChatView::default(),
            stats: None,
        }
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Loads saved history into the view. Returns the number of restored messages.
    pub fn restore(&mut self) -> usize {
        match self.storage.load_state() {
            Some(saved) => {
                self.view = ChatView::new(saved.messages, saved.session_id);
                self.view.messages.len()
            }
            None => 0,
        }
    }

    /// Checks the backend and caches statistics for `/stats`.
    ///
    /// Returns the connection error to show, if any.
    pub async fn connect(&mut self) -> Option<String> {
        if let ApiResponse::Failure { error } = self.api.check_health().await {
            warn!("Backend health check failed");
            return Some(error);
        }
        self.refresh_stats().await;
        None
    }

    pub async fn refresh_stats(&mut self) {
        match self.api.get_stats().await {
            ApiResponse::Success { data } => self.stats = Some(data),
            ApiResponse::Failure { error } => debug!("Keeping previous stats: {error}"),
        }
    }

    /// Treats `line` as the input box content when Enter is pressed.
    pub fn enter(&mut self, line: &str) -> KeyAction {
        self.view.set_input(&self.router, line);
        self.router.handle_enter(&self.view)
    }

    /// Runs a slash command against the view.
    pub fn select(&mut self, kind: CommandKind) -> Outcome {
        let before = self.view.messages.len();
        let ctx = CommandContext {
            input: &self.view.input,
            stats: self.stats.as_ref(),
        };
        let effects = self.router.select_command(kind, &ctx);

        let mut hooks = ReplHooks {
            storage: &self.storage,
            focus_requested: false,
        };
        self.view.apply(effects, &mut hooks);

        if hooks.focus_requested {
            return Outcome::Prefill(self.view.input.clone());
        }
        if kind != CommandKind::Clear {
            self.persist();
        }
        Outcome::Messages(if self.view.messages.len() < before {
            0
        } else {
            before
        })
    }

    /// Sends the current input to the backend and appends the reply or the error.
    pub async fn send(&mut self) -> Outcome {
        let question = self.view.input.trim().to_string();
        self.view.input.clear();
        self.view.show_commands = false;
        if question.is_empty() {
            return Outcome::Ignored;
        }

        let first_new = self.view.messages.len();
        self.view.push_message(ChatMessage::user(question.as_str()));

        let reply = self
            .api
            .send_chat_message(&question, self.view.session_id.as_deref())
            .await;
        match reply {
            ApiResponse::Success { data } => {
                if data.session_id.is_some() {
                    self.view.session_id = data.session_id.clone();
                }
                self.view.push_message(data.to_message());
            }
            ApiResponse::Failure { error } => {
                self.view.push_message(ChatMessage::agent(error));
            }
        }

        self.persist();
        Outcome::Messages(first_new)
    }

    fn persist(&self) {
        if !self
            .storage
            .save_state(&self.view.messages, self.view.session_id.as_deref())
        {
            warn!("Chat history was not saved");
        }
    }
}
