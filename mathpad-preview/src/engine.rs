//! Typesetting engines

use anyhow::{anyhow, bail, Context, Result};
use mathpad_core::config::{EngineConfig, EngineKind};
use mathpad_core::transform::escape_html;
use mathpad_core::{OutputSink, TypesetEngine};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>"#;

const PAGE_SCRIPTS: &str = r#"</title>
<script>
window.MathJax = {
  loader: {load: ['[tex]/ams']},
  tex: {
    packages: {'[+]': ['ams']},
    inlineMath: [['\\(', '\\)']],
    displayMath: [['\\[', '\\]']],
    processEscapes: true,
    processEnvironments: true
  },
  options: {
    skipHtmlTags: ['script', 'noscript', 'style', 'textarea', 'pre']
  }
};
</script>
<script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-chtml.js"></script>
</head>
<body>
<main id="preview">
"#;

const PAGE_TAIL: &str = "\n</main>\n</body>\n</html>\n";

/// Wraps markup in a standalone page that MathJax typesets in the browser
#[derive(Debug, Clone)]
pub struct HtmlPageEngine {
    title: String,
}

impl HtmlPageEngine {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn page(&self, markup: &str) -> String {
        let title = escape_html(&self.title);
        let mut page = String::with_capacity(
            PAGE_HEAD.len() + title.len() + PAGE_SCRIPTS.len() + markup.len() + PAGE_TAIL.len(),
        );
        page.push_str(PAGE_HEAD);
        page.push_str(&title);
        page.push_str(PAGE_SCRIPTS);
        page.push_str(markup);
        page.push_str(PAGE_TAIL);
        page
    }
}

impl TypesetEngine for HtmlPageEngine {
    fn typeset(&mut self, markup: &str, sink: &mut dyn OutputSink) -> Result<()> {
        sink.replace(&self.page(markup))
    }

    fn name(&self) -> &str {
        "html"
    }
}

/// Pipes markup through an external command, stdin to stdout
#[derive(Debug, Clone)]
pub struct CommandEngine {
    command: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl TypesetEngine for CommandEngine {
    fn typeset(&mut self, markup: &str, sink: &mut dyn OutputSink) -> Result<()> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to launch typesetter: {}", self.command))?;

        // Feed stdin from a separate thread so a chatty child cannot deadlock us
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Failed to open typesetter stdin"))?;
        let input = markup.to_owned();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for typesetter: {}", self.command))?;
        let written = writer
            .join()
            .map_err(|_| anyhow!("Typesetter stdin writer panicked"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Typesetter {} exited with status {}: {}",
                self.command,
                output.status,
                stderr.trim()
            );
        }

        // A typesetter may exit successfully without reading all of its input
        match written {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                log::debug!("Typesetter {} closed stdin early", self.command);
            }
            Err(err) => {
                return Err(err).context("Failed to write markup to typesetter");
            }
        }

        let rendered =
            String::from_utf8(output.stdout).context("Typesetter produced invalid UTF-8")?;
        sink.replace(&rendered)
    }

    fn name(&self) -> &str {
        &self.command
    }
}

/// Build the engine selected by configuration
pub fn from_config(config: &EngineConfig, title: &str) -> Result<Box<dyn TypesetEngine>> {
    match config.kind {
        EngineKind::Html => Ok(Box::new(HtmlPageEngine::new(title))),
        EngineKind::Command => {
            if config.command.trim().is_empty() {
                bail!("Engine kind is Command but no engine command is configured");
            }
            Ok(Box::new(CommandEngine::new(
                config.command.clone(),
                config.args.clone(),
            )))
        }
    }
}
