use crate::cli::ux::{
    ChatMessageType, WaitSpinner, present_warning, render_message, style_chat_text,
};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::path::PathBuf;
use tracing::debug;
use zuschat_core::api::ApiClient;
use zuschat_core::commands::{CommandRouter, KeyAction};
use zuschat_core::message::Role;
use zuschat_core::storage::{ChatStorage, StateStore};

mod app;
mod compl;

pub use app::{ChatApp, Outcome};
use compl::Repl;

const EXIT_COMMANDS: [&str; 3] = ["/quit", "/exit", "/q"];

/// Executes the chat command, starting an interactive REPL session.
pub async fn execute<S: StateStore>(
    api: ApiClient,
    storage: ChatStorage<S>,
    history_path: Option<PathBuf>,
) -> Result<()> {
    let mut app = ChatApp::new(api, CommandRouter::new(), storage);

    let restored = app.restore();
    if restored > 0 {
        println!(
            "{}",
            style_chat_text(
                &format!("Restored {restored} messages from your last session."),
                ChatMessageType::Footer
            )
        );
        for message in &app.view().messages {
            println!("{}\n", render_message(message));
        }
    }

    let spinner = WaitSpinner::new("Connecting...");
    let connection_error = app.connect().await;
    spinner.clear();
    if let Some(error) = connection_error {
        present_warning(&error);
    }

    run(&mut app, history_path).await
}

/// Chat UX loop.
async fn run<S: StateStore>(app: &mut ChatApp<S>, history_path: Option<PathBuf>) -> Result<()> {
    println!("Welcome to zuschat! Type '/' and press Tab for commands, Ctrl-D to exit.");

    let config = Config::builder()
        .history_ignore_dups(true)?
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl: Editor<Repl, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(Repl {
        router: app.router().clone(),
    }));
    if let Some(path) = &history_path {
        if let Err(e) = rl.load_history(path) {
            debug!("No input history loaded: {e}");
        }
    }

    let prompt = style_chat_text("> ", ChatMessageType::Prompt).to_string();
    let mut prefill = String::new();
    let result = loop {
        let readline = if prefill.is_empty() {
            rl.readline(&prompt)
        } else {
            rl.readline_with_initial(&prompt, (prefill.as_str(), ""))
        };
        prefill.clear();

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;

                if EXIT_COMMANDS.contains(&line.trim()) {
                    println!("Bye!");
                    break Ok(());
                }

                let outcome = match app.enter(&line) {
                    KeyAction::Select(kind) => app.select(kind),
                    KeyAction::Send => {
                        let spinner = WaitSpinner::new("Thinking...");
                        let outcome = app.send().await;
                        spinner.clear();
                        outcome
                    }
                    KeyAction::Nothing => Outcome::Ignored,
                };

                match outcome {
                    Outcome::Messages(first_new) => {
                        // The user already sees what they typed
                        let new_messages = app.view().messages.iter().skip(first_new);
                        for message in new_messages.filter(|m| m.role == Role::Agent) {
                            println!("{}\n", render_message(message));
                        }
                    }
                    Outcome::Prefill(text) => prefill = text,
                    Outcome::Ignored => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Press Ctrl-D or type /quit to exit.");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nBye!");
                break Ok(());
            }
            Err(err) => break Err(err.into()),
        }
    };

    if let Some(path) = &history_path {
        if let Err(e) = rl.save_history(path) {
            debug!("Failed to save input history: {e}");
        }
    }
    result
}
