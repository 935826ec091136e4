//! Output sinks for rendered previews

use anyhow::{anyhow, Context, Result};
use mathpad_core::OutputSink;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Writes each render to a file, replacing it atomically
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "preview".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl OutputSink for FileSink {
    fn replace(&mut self, rendered: &str) -> Result<()> {
        let tmp = self.temp_path();
        fs::write(&tmp, rendered)
            .with_context(|| format!("Failed to write preview: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace preview: {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: Option<String>,
    replacements: usize,
}

/// Shared in-memory output surface; clones observe the same contents
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current output, if anything has been rendered yet
    pub fn contents(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.contents.clone())
    }

    /// Number of times the output has been replaced
    pub fn replacements(&self) -> usize {
        self.state.lock().map(|s| s.replacements).unwrap_or(0)
    }
}

impl OutputSink for MemorySink {
    fn replace(&mut self, rendered: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("Preview output lock poisoned"))?;
        state.contents = Some(rendered.to_string());
        state.replacements += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_sink_replaces_contents() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("preview.html");
        let mut sink = FileSink::new(&path);

        sink.replace("first")?;
        sink.replace("second")?;

        assert_eq!(fs::read_to_string(&path)?, "second");
        assert!(!dir.path().join("preview.html.tmp").exists());

        Ok(())
    }

    #[test]
    fn test_file_sink_missing_directory_fails() {
        let mut sink = FileSink::new("/definitely/not/here/preview.html");
        assert!(sink.replace("x").is_err());
    }

    #[test]
    fn test_memory_sink_clones_share_state() -> Result<()> {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        assert_eq!(sink.contents(), None);

        writer.replace("<p>x</p>")?;
        assert_eq!(sink.contents().as_deref(), Some("<p>x</p>"));
        assert_eq!(sink.replacements(), 1);

        Ok(())
    }
}
