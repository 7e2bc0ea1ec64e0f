mod presenter;
mod progress;

pub use presenter::{ChatMessageType, render_message, style_chat_text};
pub use progress::WaitSpinner;

use console::style;

/// Prints a formatted error message to stderr.
pub fn present_error(error: anyhow::Error) {
    let error_text = style("ERROR:").red().bold();
    eprintln!("\n{error_text} {error:#}");
}

/// Prints a non fatal warning to stderr.
pub fn present_warning(text: &str) {
    eprintln!("{}", style_chat_text(text, ChatMessageType::Error));
}
