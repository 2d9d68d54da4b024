// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Terminal output helpers

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::pipeline::TaskParams;

/// Outcome marker printed in front of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Failed,
    Warning,
    Info,
}

impl Status {
    pub fn symbol(self) -> ColoredString {
        match self {
            Self::Ok => "✓".green(),
            Self::Failed => "✗".red(),
            Self::Warning => "⚠".yellow(),
            Self::Info => "→".blue(),
        }
    }
}

/// Print an indented status line to stdout
pub fn line(status: Status, message: impl std::fmt::Display) {
    println!("  {} {}", status.symbol(), message);
}

/// Spinner for a step of unknown length; call `finish_and_clear` when done
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// `retries=3, retry_delay=5m`
pub fn params_summary(params: &TaskParams) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{raw_params, ParamValue};

    #[test]
    fn test_params_summary() {
        let params = TaskParams::from_raw(
            "test",
            &raw_params([
                ("retries", ParamValue::Int(3)),
                ("depends_on_past", ParamValue::Bool(false)),
            ]),
        )
        .unwrap();

        assert_eq!(params_summary(&params), "depends_on_past=false, retries=3");
        assert_eq!(params_summary(&TaskParams::new()), "");
    }

    #[test]
    fn test_symbols_differ() {
        colored::control::set_override(false);
        assert_eq!(Status::Ok.symbol().to_string(), "✓");
        assert_eq!(Status::Failed.symbol().to_string(), "✗");
    }
}
