//! Document model with Rope-based text storage

use anyhow::{Context, Result};
use ropey::Rope;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::commands::{self, WrapCommand};
use crate::config::DelimiterConfig;
use crate::content::EditEvent;

/// The document being previewed
#[derive(Clone, Debug)]
pub struct Document {
    pub path: PathBuf,
    pub rope: Rope,
    pub rev: u64,
}

impl Document {
    /// Load a document from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize path: {}", path.display()))?;

        let content = fs::read_to_string(&abs_path)
            .with_context(|| format!("Failed to read file: {}", abs_path.display()))?;

        Ok(Self {
            path: abs_path,
            rope: Rope::from_str(&content),
            rev: 1,
        })
    }

    /// Reload the document from disk.
    ///
    /// Returns false, leaving the revision alone, when the text is unchanged.
    pub fn reload(&mut self) -> Result<bool> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to reload file: {}", self.path.display()))?;

        if self.rope == content.as_str() {
            return Ok(false);
        }

        self.rope = Rope::from_str(&content);
        self.rev += 1;
        Ok(true)
    }

    /// Get the number of lines in the document
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Full text of the document
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Snapshot the document as an edit event for the preview pipeline
    pub fn edit_event(&self) -> EditEvent {
        EditEvent::new(self.text())
    }

    /// Apply an editor wrap command to a char range, returning the new cursor
    pub fn apply_command(
        &mut self,
        command: WrapCommand,
        selection: Range<usize>,
        delimiters: &DelimiterConfig,
    ) -> usize {
        let cursor = commands::apply(&mut self.rope, selection, command, delimiters);
        self.rev += 1;
        cursor
    }

    /// Write the document back to disk
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, self.text())
            .with_context(|| format!("Failed to write file: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"")?;

        let doc = Document::load(file.path())?;
        assert_eq!(doc.line_count(), 1); // Empty file has 1 line in Rope
        assert_eq!(doc.rev, 1);
        assert_eq!(doc.edit_event(), EditEvent::new(""));

        Ok(())
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = Document::load(Path::new("/definitely/not/here.tex"));
        assert!(result.is_err());
    }

    #[test]
    fn test_reload_increments_revision() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"Initial $x$\n")?;
        file.flush()?;

        let mut doc = Document::load(file.path())?;
        assert_eq!(doc.rev, 1);

        file.write_all(b"More $y$\n")?;
        file.flush()?;

        assert!(doc.reload()?);
        assert_eq!(doc.rev, 2);
        assert_eq!(doc.text(), "Initial $x$\nMore $y$\n");

        Ok(())
    }

    #[test]
    fn test_reload_unchanged_keeps_revision() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"same\n")?;
        file.flush()?;

        let mut doc = Document::load(file.path())?;
        assert!(!doc.reload()?);
        assert_eq!(doc.rev, 1);

        Ok(())
    }

    #[test]
    fn test_apply_command_and_save() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"E=mc^2")?;
        file.flush()?;

        let mut doc = Document::load(file.path())?;
        let cursor = doc.apply_command(WrapCommand::Math, 0..6, &DelimiterConfig::default());
        assert_eq!(cursor, 8);
        assert_eq!(doc.rev, 2);
        assert_eq!(doc.edit_event(), EditEvent::new("$E=mc^2$"));

        doc.save()?;
        assert_eq!(std::fs::read_to_string(file.path())?, "$E=mc^2$");

        Ok(())
    }
}
