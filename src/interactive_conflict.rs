use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{InquireError, Select};

use crate::conflict::{DocumentViewer, UserChoicePrompt};

/// Check if we're running in an interactive terminal
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)
}

/// Terminal prompt backed by `inquire`; Esc dismisses.
pub struct TerminalPrompt;

impl UserChoicePrompt for TerminalPrompt {
    fn ask(&self, title: &str, options: &[&str]) -> Result<Option<String>> {
        println!("\n{}", title.yellow().bold());

        let answer = Select::new("How would you like to resolve this?", options.to_vec())
            .with_help_message("Use arrow keys to navigate, Enter to select, Esc to skip")
            .prompt_skippable();

        match answer {
            Ok(choice) => Ok(choice.map(str::to_string)),
            Err(InquireError::NotTTY) => Ok(None),
            Err(e) => Err(e).context("Failed to get resolution choice"),
        }
    }
}

/// Prints documents to the terminal, coloring side-by-side diff rows.
pub struct TerminalViewer;

impl DocumentViewer for TerminalViewer {
    fn show_document(&self, title: &str, document: &str) -> Result<()> {
        println!("\n{}", "=".repeat(80).cyan());
        println!("{}", title.bold().cyan());
        println!("{}", "=".repeat(80).cyan());

        for line in document.lines() {
            if line.starts_with('-') {
                println!("{}", line.red());
            } else if line.contains(" | + ") {
                println!("{}", line.green());
            } else {
                println!("{line}");
            }
        }

        println!("{}", "=".repeat(80).cyan());
        Ok(())
    }
}
