// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human and `--json` rendering shared by all commands.

use std::io::IsTerminal;

use leadpool_core::LeadpoolError;
use serde::Serialize;

/// Where and how command results are printed.
pub struct Output {
    json: bool,
    color: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            color: !json && std::io::stdout().is_terminal(),
        }
    }

    /// Print `value` as JSON, or call `human` with the color flag.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&Painter)) {
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
            );
        } else {
            human(&Painter { color: self.color });
        }
    }

    pub fn error(&self, error: &LeadpoolError) {
        if self.json {
            let body = serde_json::json!({
                "error": error.to_string(),
                "retryable": error.is_retryable(),
            });
            eprintln!("{body}");
        } else if std::io::stderr().is_terminal() {
            use colored::Colorize;
            eprintln!("{} {error}", "error:".red().bold());
        } else {
            eprintln!("error: {error}");
        }
    }
}

/// Optional coloring of status words.
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn good(&self, text: &str) -> String {
        if self.color {
            use colored::Colorize;
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn bad(&self, text: &str) -> String {
        if self.color {
            use colored::Colorize;
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn warn(&self, text: &str) -> String {
        if self.color {
            use colored::Colorize;
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }
}
