//! CLI output formatting.
//!
//! Every command result implements [`CommandOutput`] and is printed either
//! as human-readable text or as pretty JSON.

pub mod progress;
pub mod table;

use serde::Serialize;

pub use progress::{create_spinner, ProgressBarExt};
pub use table::TableFormatter;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Color a stage label by how it ended.
pub fn styled_stage(label: &str) -> String {
    let style = console::style(label);
    match label {
        "success" => style.green(),
        "error" | "quota" => style.red(),
        "idle" => style.dim(),
        _ => style.cyan(),
    }
    .to_string()
}

/// Truncate a string to at most `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a rather long message", 10), "a rathe...");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }
}
