//! A watched document wired to a running pipeline

use anyhow::{Context, Result};
use mathpad_core::config::DelimiterConfig;
use mathpad_core::{Config, Document, ErrorInfo, NotificationBus, OutputSink, TypesetEngine};

use crate::console::ConsoleCommand;
use crate::pipeline::{Pipeline, PipelineHandle};
use crate::watcher::FileWatcher;

/// Keeps the preview in step with the document on disk and with console commands
pub struct Session {
    doc: Document,
    watcher: FileWatcher,
    handle: PipelineHandle,
    delimiters: DelimiterConfig,
}

impl Session {
    /// Start watching the document and queue its first render
    pub fn start(
        config: &Config,
        doc: Document,
        engine: Box<dyn TypesetEngine>,
        sink: Box<dyn OutputSink>,
        bus: NotificationBus,
    ) -> Result<Self> {
        let watcher = FileWatcher::new(&doc.path)
            .with_context(|| format!("Failed to watch document: {}", doc.path.display()))?;
        let handle = Pipeline::spawn(config, engine, sink, bus)?;
        handle.load(doc.edit_event())?;

        Ok(Self {
            doc,
            watcher,
            handle,
            delimiters: config.delimiters.clone(),
        })
    }

    /// Forward a saved change to the pipeline. Returns true if an edit was sent.
    ///
    /// Read failures are published on the bus rather than returned.
    pub fn poll_file(&mut self) -> Result<bool> {
        if !self.watcher.poll_changed() {
            return Ok(false);
        }
        match self.doc.reload() {
            Ok(true) => {
                self.handle.edit(self.doc.edit_event())?;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                log::warn!("{:#}", e);
                self.handle.report(ErrorInfo::input(&e))?;
                Ok(false)
            }
        }
    }

    /// Run one console command. Returns false once the session should end.
    pub fn apply(&mut self, command: ConsoleCommand) -> Result<bool> {
        match command {
            ConsoleCommand::Live(live) => self.handle.set_live(live)?,
            ConsoleCommand::Render => self.handle.flush()?,
            ConsoleCommand::Status => {
                let status = self.handle.status()?;
                log::info!(
                    "Queue {} (live: {}, renders: {}, superseded: {}, stalled: {})",
                    status.state,
                    status.live,
                    status.invocations,
                    status.superseded,
                    status.stalled
                );
            }
            ConsoleCommand::Wrap { command, selection } => {
                let cursor = self
                    .doc
                    .apply_command(command, selection, &self.delimiters);
                self.doc.save()?;
                log::info!("Applied {:?}, cursor at {}", command, cursor);
                self.handle.edit(self.doc.edit_event())?;
            }
            ConsoleCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn handle(&self) -> &PipelineHandle {
        &self.handle
    }

    /// Stop the pipeline and wait for it to exit
    pub fn shutdown(self) -> Result<()> {
        self.handle.shutdown()
    }
}
