//! Error reports carried on the notification bus

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of the pipeline an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The typesetting engine rejected or failed a render
    Render,
    /// The input source could not be read
    Input,
}

impl ErrorCategory {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Render => "render",
            ErrorCategory::Input => "input",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cloneable, flattened error suitable for fanning out to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Category of the failure
    pub category: ErrorCategory,
    /// Short human-readable message
    pub message: String,
    /// Full context chain of the underlying error
    pub cause: String,
}

impl ErrorInfo {
    pub fn new(
        category: ErrorCategory,
        message: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            cause: cause.into(),
        }
    }

    /// Build a render failure from an engine error
    pub fn render(err: &anyhow::Error) -> Self {
        Self::new(
            ErrorCategory::Render,
            "Failed to render LaTeX content",
            format!("{:#}", err),
        )
    }

    /// Build an input failure from an I/O error
    pub fn input(err: &anyhow::Error) -> Self {
        Self::new(
            ErrorCategory::Input,
            "Failed to read document",
            format!("{:#}", err),
        )
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category, self.message, self.cause)
    }
}
