//! Content snapshots flowing through the preview pipeline

use std::fmt;

/// One observed snapshot of the full raw document text.
///
/// Edit events carry no identity beyond their text; any later event
/// supersedes an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditEvent {
    text: String,
}

impl EditEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl From<String> for EditEvent {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for EditEvent {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Display-ready markup derived from exactly one [`EditEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedContent {
    markup: String,
}

impl ProcessedContent {
    pub(crate) fn new(markup: String) -> Self {
        Self { markup }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn len(&self) -> usize {
        self.markup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty()
    }
}

impl fmt::Display for ProcessedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markup)
    }
}
