//! Configuration management for mathpad

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub delimiters: DelimiterConfig,
    pub preview: PreviewConfig,
    pub engine: EngineConfig,
    pub watch: WatchConfig,
}

/// Math delimiter pairs recognised by the transformer, as `[open, close]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimiterConfig {
    pub inline: [String; 2],
    pub display: [String; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Render while typing; when false, content waits until re-enabled
    pub live: bool,
    /// Quiet period applied to raw edits
    pub input_debounce_ms: u64,
    /// Quiet period applied before transform and render
    pub render_debounce_ms: u64,
    /// Warn once an engine call has been in flight this long
    pub stall_warning_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    /// Standalone HTML page typeset by MathJax in the browser
    Html,
    /// External command reading markup on stdin
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    pub poll_ms: u64,
}

impl Default for DelimiterConfig {
    fn default() -> Self {
        Self {
            inline: ["$".to_string(), "$".to_string()],
            display: ["$$".to_string(), "$$".to_string()],
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            live: true,
            input_debounce_ms: 300,
            render_debounce_ms: 500,
            stall_warning_ms: 5000,
        }
    }
}

impl PreviewConfig {
    pub fn input_debounce(&self) -> Duration {
        Duration::from_millis(self.input_debounce_ms)
    }

    pub fn render_debounce(&self) -> Duration {
        Duration::from_millis(self.render_debounce_ms)
    }

    pub fn stall_warning(&self) -> Duration {
        Duration::from_millis(self.stall_warning_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Html,
            command: String::new(),
            args: Vec::new(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_ms: 100,
        }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "mathpad")
            .map(|proj_dirs| proj_dirs.config_dir().join("mathpad.toml"))
    }

    /// Load configuration from file, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        // Check config file permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
            if metadata.permissions().mode() & 0o002 != 0 {
                anyhow::bail!(
                    "Config file {} is world-writable (insecure permissions)",
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.delimiters.inline, ["$", "$"]);
        assert_eq!(config.delimiters.display, ["$$", "$$"]);
        assert!(config.preview.live);
        assert_eq!(config.preview.input_debounce(), Duration::from_millis(300));
        assert_eq!(config.preview.render_debounce(), Duration::from_millis(500));
        assert_eq!(config.engine.kind, EngineKind::Html);
        assert!(config.watch.enabled);
    }

    #[test]
    fn test_load_valid_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        let toml_content = "[delimiters]\n\
inline = [\"\\\\(\", \"\\\\)\"]\n\
display = [\"\\\\[\", \"\\\\]\"]\n\
\n\
[preview]\n\
live = false\n\
input_debounce_ms = 150\n\
render_debounce_ms = 250\n\
stall_warning_ms = 1000\n\
\n\
[engine]\n\
kind = \"Command\"\n\
command = \"pandoc\"\n\
args = [\"--mathjax\"]\n";
        file.write_all(toml_content.as_bytes())?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.delimiters.inline, ["\\(", "\\)"]);
        assert_eq!(config.delimiters.display, ["\\[", "\\]"]);
        assert!(!config.preview.live);
        assert_eq!(config.preview.input_debounce_ms, 150);
        assert_eq!(config.preview.stall_warning(), Duration::from_secs(1));
        assert_eq!(config.engine.kind, EngineKind::Command);
        assert_eq!(config.engine.command, "pandoc");
        assert_eq!(config.engine.args, vec!["--mathjax".to_string()]);

        Ok(())
    }

    #[test]
    fn test_load_partial_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"[preview]\ninput_debounce_ms = 50\n")?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.preview.input_debounce_ms, 50);
        // Untouched fields keep their defaults
        assert_eq!(config.preview.render_debounce_ms, 500);
        assert!(config.preview.live);
        assert_eq!(config.delimiters, DelimiterConfig::default());

        Ok(())
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"invalid toml [[[syntax").unwrap();

        let result = Config::load_from(file.path());
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_world_writable_config_rejected() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let file = NamedTempFile::new()?;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666))?;

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("world-writable"));

        Ok(())
    }

    #[test]
    fn test_config_path_returns_some() {
        let path = Config::config_path();
        assert!(path.is_some());
        if let Some(p) = path {
            assert!(p.to_string_lossy().contains("mathpad"));
            assert!(p.to_string_lossy().ends_with("mathpad.toml"));
        }
    }

    #[test]
    fn test_engine_kind_serialization() -> Result<()> {
        let mut config = Config::default();
        config.engine.kind = EngineKind::Command;

        let toml_str = toml::to_string(&config)?;
        assert!(toml_str.contains("Command"));

        let parsed: Config = toml::from_str(&toml_str)?;
        assert_eq!(parsed.engine.kind, EngineKind::Command);

        Ok(())
    }
}
