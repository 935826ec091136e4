//! Line commands read from stdin while a preview is running

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::Receiver;
use mathpad_core::commands::WrapCommand;
use std::io::BufRead;
use std::ops::Range;
use std::str::FromStr;
use std::thread;

const WRAP_USAGE: &str = "Usage: wrap <bold|italic|math|displaymath> <start> <end>";

/// One command typed at the preview console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `live on` / `live off`
    Live(bool),
    /// Settle pending edits now
    Render,
    /// Log a queue status snapshot
    Status,
    /// Wrap a char range of the document and save it
    Wrap {
        command: WrapCommand,
        selection: Range<usize>,
    },
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            bail!("Empty command");
        };

        let command = match name {
            "live" => match words.next() {
                Some("on") => ConsoleCommand::Live(true),
                Some("off") => ConsoleCommand::Live(false),
                _ => bail!("Usage: live on|off"),
            },
            "render" => ConsoleCommand::Render,
            "status" => ConsoleCommand::Status,
            "quit" | "exit" => ConsoleCommand::Quit,
            "wrap" => {
                let command = words
                    .next()
                    .ok_or_else(|| anyhow!(WRAP_USAGE))?
                    .parse::<WrapCommand>()?;
                let start = offset(words.next())?;
                let end = offset(words.next())?;
                ConsoleCommand::Wrap {
                    command,
                    selection: start..end,
                }
            }
            other => bail!("Unknown command: {}", other),
        };

        if let Some(extra) = words.next() {
            bail!("Unexpected argument to {}: {}", name, extra);
        }
        Ok(command)
    }
}

fn offset(word: Option<&str>) -> Result<usize> {
    let word = word.ok_or_else(|| anyhow!(WRAP_USAGE))?;
    word.parse()
        .with_context(|| format!("Invalid character offset: {}", word))
}

/// Forward non-empty stdin lines over a channel.
///
/// The channel disconnects when stdin reaches end of file.
pub fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();

    thread::Builder::new()
        .name("mathpad-console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if tx.send(line.to_string()).is_err() {
                    break;
                }
            }
            log::debug!("Console input closed");
        })
        .context("Failed to spawn console thread")?;

    Ok(rx)
}
