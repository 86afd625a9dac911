//! Command-line interface over the workflow pipeline.

pub mod commands;
pub mod context;
pub mod output;
pub mod types;

pub use context::build_pipeline;
pub use types::{Cli, Commands, HealTarget};

use crate::domain::errors::CoordinatorError;

/// Render a command failure, pointing at `--recover` when a stage is busy.
pub fn error_message(err: &anyhow::Error) -> String {
    let busy = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<CoordinatorError>(),
            Some(CoordinatorError::StageBusy { .. })
        )
    });
    if busy {
        format!("{err:#} (if the process that started it has exited, rerun with --recover)")
    } else {
        format!("{err:#}")
    }
}

/// Print a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let message = error_message(&err);
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": message,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {message}", console::style("error:").red().bold());
    }
    std::process::exit(1)
}
