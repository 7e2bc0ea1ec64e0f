use crate::cli::ux::{ChatMessageType, style_chat_text};
use rustyline::completion::{Candidate, Completer};
use rustyline::error::ReadlineError;
use rustyline::hint::{Hint, Hinter};
use rustyline::{Helper, Highlighter, Validator};
use zuschat_core::commands::{CommandRouter, CommandSpec};

/// Completion candidate for the REPL.
#[derive(Debug)]
pub struct CompletionCandidate {
    text: String,
    display_string: String,
}

impl CompletionCandidate {
    fn new(spec: &CommandSpec, replacement: String) -> Self {
        let label = format!("{:<12}{}", spec.command, spec.description);
        let display_string = style_chat_text(&label, ChatMessageType::Footer).to_string();
        Self {
            text: replacement,
            display_string,
        }
    }
}

impl Candidate for CompletionCandidate {
    fn display(&self) -> &str {
        &self.display_string
    }

    fn replacement(&self) -> &str {
        &self.text
    }
}

/// Inline hint: the rest of the first matching command plus its description.
#[derive(Debug)]
pub struct CommandHint {
    display: String,
    completion: String,
}

impl Hint for CommandHint {
    fn display(&self) -> &str {
        &self.display
    }

    fn completion(&self) -> Option<&str> {
        Some(&self.completion)
    }
}

/// Line editor helper backed by the slash command registry.
#[derive(Helper, Validator, Highlighter)]
pub struct Repl {
    pub router: CommandRouter,
}

impl Completer for Repl {
    type Candidate = CompletionCandidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        let line_to_pos = &line[..pos];
        if !self.router.should_show_commands(line_to_pos) {
            return Ok((0, Vec::new()));
        }

        // Commands that act immediately complete to their bare name so Enter runs them
        let candidates = self
            .router
            .filter_commands(line_to_pos)
            .into_iter()
            .map(|spec| {
                let replacement = if spec.kind.runs_locally() {
                    spec.command.to_string()
                } else {
                    self.router.build_command_string(spec.kind, line_to_pos)
                };
                CompletionCandidate::new(spec, replacement)
            })
            .collect();

        Ok((0, candidates))
    }
}

impl Hinter for Repl {
    type Hint = CommandHint;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if line.is_empty() || pos < line.len() {
            return None;
        }
        let spec = self.router.filter_commands(line).into_iter().next()?;
        let rest = spec.command.get(line.len()..).unwrap_or_default();
        let detail = if spec.example.is_empty() {
            format!("  {}", spec.description)
        } else {
            format!("  {} (e.g. {})", spec.description, spec.example)
        };

        Some(CommandHint {
            display: format!(
                "{}{}",
                rest,
                style_chat_text(&detail, ChatMessageType::Footer)
            ),
            completion: rest.to_string(),
        })
    }
}
