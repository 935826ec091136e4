//! Mathpad Preview - Threaded live-preview runtime
//!
//! This crate wires the core pipeline pieces to real threads and I/O:
//! - Pipeline thread (debounce, transform, render queue, notifications)
//! - Engine worker thread
//! - Typesetting engines and output sinks
//! - File watcher input source and stdin console

pub mod console;
pub mod engine;
pub mod event;
pub mod pipeline;
pub mod sink;
pub mod worker;

#[cfg(feature = "watch")]
pub mod session;
#[cfg(feature = "watch")]
pub mod watcher;

use anyhow::{anyhow, Result};
use crossbeam_channel::select;
use mathpad_core::{
    Config, Document, Notification, NotificationBus, OutputSink, Topic, TypesetEngine,
};

// Re-export main types
pub use console::ConsoleCommand;
pub use event::{PipelineRequest, QueueStatus};
pub use pipeline::{Pipeline, PipelineHandle};
pub use sink::{FileSink, MemorySink};

#[cfg(feature = "watch")]
pub use session::Session;

/// Bus with the default logging subscribers attached
pub fn logging_bus() -> NotificationBus {
    let mut bus = NotificationBus::new();
    bus.subscribe(Topic::ContentChanged, |_| {
        log::info!("Preview updated");
        Ok(())
    });
    bus.subscribe(Topic::Error, |notification| {
        if let Notification::Error(error) = notification {
            log::error!("{}", error);
        }
        Ok(())
    });
    bus
}

/// Render the document once and wait for the outcome
pub fn render_once(
    config: &Config,
    doc: &Document,
    engine: Box<dyn TypesetEngine>,
    sink: Box<dyn OutputSink>,
) -> Result<()> {
    let mut bus = logging_bus();
    let changed = bus.subscribe_channel(Topic::ContentChanged);
    let errors = bus.subscribe_channel(Topic::Error);

    // A one-shot render ignores the live toggle
    let mut config = config.clone();
    config.preview.live = true;

    let handle = Pipeline::spawn(&config, engine, sink, bus)?;
    handle.load(doc.edit_event())?;
    handle.flush()?;

    let result = select! {
        recv(changed) -> msg => {
            msg.map(|_| ())
                .map_err(|_| anyhow!("Preview pipeline stopped before rendering"))
        }
        recv(errors) -> msg => match msg {
            Ok(Notification::Error(error)) => Err(anyhow!("{}", error)),
            _ => Err(anyhow!("Preview pipeline stopped before rendering")),
        },
    };

    handle.shutdown()?;
    result
}

/// Render the document, then keep re-rendering it as it changes on disk.
///
/// Console commands typed on stdin are applied between file polls.
#[cfg(feature = "watch")]
pub fn run(
    config: &Config,
    doc: Document,
    engine: Box<dyn TypesetEngine>,
    sink: Box<dyn OutputSink>,
) -> Result<()> {
    use std::time::Duration;

    if !config.watch.enabled {
        return render_once(config, &doc, engine, sink);
    }

    let mut session = Session::start(config, doc, engine, sink, logging_bus())?;
    let lines = console::spawn_stdin_reader()?;
    let mut console_open = true;

    log::info!("Watching {} for changes", session.document().path.display());
    if !config.preview.live {
        log::info!("Live preview is off; type `live on` to update the preview");
    }
    let poll = Duration::from_millis(config.watch.poll_ms);

    let mut running = true;
    while running {
        let input = if console_open {
            lines.clone()
        } else {
            crossbeam_channel::never()
        };

        select! {
            recv(input) -> line => match line {
                Ok(line) => match line.parse::<ConsoleCommand>() {
                    Ok(command) => match session.apply(command) {
                        Ok(keep_running) => running = keep_running,
                        Err(e) => log::warn!("{:#}", e),
                    },
                    Err(e) => log::warn!("{:#}", e),
                },
                Err(_) => console_open = false,
            },
            default(poll) => {}
        }

        // The pipeline debounces edits itself, so report changes as soon as they arrive
        session.poll_file()?;
    }

    session.shutdown()
}

/// Without file watching there is nothing to do after the first render
#[cfg(not(feature = "watch"))]
pub fn run(
    config: &Config,
    doc: Document,
    engine: Box<dyn TypesetEngine>,
    sink: Box<dyn OutputSink>,
) -> Result<()> {
    use anyhow::Context;

    if config.watch.enabled {
        log::warn!("Built without file watching; rendering once");
    }
    render_once(config, &doc, engine, sink).context("Preview render failed")
}
