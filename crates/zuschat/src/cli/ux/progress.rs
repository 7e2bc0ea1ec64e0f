use indicatif::{ProgressBar, ProgressStyle};

/// A spinner shown while waiting on the backend.
#[derive(Debug)]
pub struct WaitSpinner {
    spinner: ProgressBar,
}

impl WaitSpinner {
    pub fn new(msg: impl Into<String>) -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.set_message(msg.into());
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { spinner }
    }

    /// Stops the spinner and clears it from the terminal.
    pub fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}
