//! Editor wrap commands (bold, italic, inline and display math)

use anyhow::{bail, Result};
use ropey::Rope;
use std::ops::Range;
use std::str::FromStr;

use crate::config::DelimiterConfig;

/// A command that wraps the current selection in a pair of markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapCommand {
    Bold,
    Italic,
    Math,
    DisplayMath,
}

impl WrapCommand {
    /// Opening and closing markers for this command
    pub fn markers<'a>(&self, delimiters: &'a DelimiterConfig) -> (&'a str, &'a str) {
        match self {
            WrapCommand::Bold => ("\\textbf{", "}"),
            WrapCommand::Italic => ("\\textit{", "}"),
            WrapCommand::Math => (delimiters.inline[0].as_str(), delimiters.inline[1].as_str()),
            WrapCommand::DisplayMath => (
                delimiters.display[0].as_str(),
                delimiters.display[1].as_str(),
            ),
        }
    }
}

impl FromStr for WrapCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bold" => Ok(WrapCommand::Bold),
            "italic" => Ok(WrapCommand::Italic),
            "math" => Ok(WrapCommand::Math),
            "displaymath" => Ok(WrapCommand::DisplayMath),
            other => bail!("Unknown editor command: {}", other),
        }
    }
}

/// Wrap the selection (char indices) and return the new cursor position.
///
/// With an empty selection the cursor lands between the markers; otherwise
/// it lands after the wrapped text.
pub fn apply(
    rope: &mut Rope,
    selection: Range<usize>,
    command: WrapCommand,
    delimiters: &DelimiterConfig,
) -> usize {
    let len = rope.len_chars();
    let (mut start, mut end) = (selection.start.min(len), selection.end.min(len));
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }

    let (open, close) = command.markers(delimiters);
    let open_len = open.chars().count();
    let close_len = close.chars().count();

    rope.insert(end, close);
    rope.insert(start, open);

    if start == end {
        start + open_len
    } else {
        end + open_len + close_len
    }
}
