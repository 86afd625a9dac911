//! Spinners around remote calls.
//!
//! Spinners draw on stderr and are hidden in JSON mode so stdout stays
//! machine-readable.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Create a spinner showing `message`.
///
/// # Example
/// ```
/// use apiheal::cli::output::progress::create_spinner;
///
/// let spinner = create_spinner("Uploading project...", true);
/// spinner.finish_and_clear();
/// ```
pub fn create_spinner(message: impl Into<String>, hidden: bool) -> ProgressBar {
    if hidden {
        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
        spinner.set_message(message.into());
        return spinner;
    }

    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS);
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(style);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Common ways of finishing a spinner.
pub trait ProgressBarExt {
    /// Finish with a success message (green checkmark)
    fn finish_success(&self, message: impl Into<String>);

    /// Finish with an error message (red X)
    fn finish_error(&self, message: impl Into<String>);

    /// Finish with a warning message (yellow !)
    fn finish_warning(&self, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("{} {}", console::style("✓").green(), message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.finish_with_message(format!("{} {}", console::style("✗").red(), message.into()));
    }

    fn finish_warning(&self, message: impl Into<String>) {
        self.finish_with_message(format!("{} {}", console::style("!").yellow(), message.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_spinner_keeps_message() {
        let spinner = create_spinner("Running suite...", true);
        assert!(spinner.is_hidden());
        assert_eq!(spinner.message(), "Running suite...");
        spinner.finish_success("done");
        assert!(spinner.is_finished());
    }
}
