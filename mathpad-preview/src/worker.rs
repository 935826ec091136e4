//! Background typesetting worker thread

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use mathpad_core::{ErrorInfo, OutputSink, RenderJob, TypesetEngine};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

/// Result of one engine invocation
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub job_id: u64,
    pub result: Result<(), ErrorInfo>,
    pub elapsed: Duration,
}

/// Engine worker handle
///
/// The worker owns the engine and the sink and runs one job at a time, so
/// the engine is never entered twice. Dropping the handle lets the thread
/// exit once its current job (if any) returns.
pub struct EngineWorker {
    request_tx: Sender<RenderJob>,
    result_rx: Receiver<RenderResult>,
    _worker_thread: thread::JoinHandle<()>,
}

impl EngineWorker {
    /// Spawn a new engine worker thread
    pub fn spawn(engine: Box<dyn TypesetEngine>, sink: Box<dyn OutputSink>) -> Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let worker_thread = thread::Builder::new()
            .name("mathpad-engine".to_string())
            .spawn(move || worker_loop(engine, sink, request_rx, result_tx))
            .context("Failed to spawn engine worker thread")?;

        Ok(Self {
            request_tx,
            result_rx,
            _worker_thread: worker_thread,
        })
    }

    /// Hand a job to the engine
    pub fn start(&self, job: RenderJob) -> Result<()> {
        self.request_tx
            .send(job)
            .map_err(|_| anyhow!("Engine worker has stopped"))
    }

    /// Channel of finished jobs
    pub fn results(&self) -> &Receiver<RenderResult> {
        &self.result_rx
    }
}

/// Worker thread main loop
fn worker_loop(
    mut engine: Box<dyn TypesetEngine>,
    mut sink: Box<dyn OutputSink>,
    request_rx: Receiver<RenderJob>,
    result_tx: Sender<RenderResult>,
) {
    for job in request_rx.iter() {
        let started = Instant::now();
        log::debug!(
            "Typesetting job {} ({} bytes) with {}",
            job.id,
            job.content.len(),
            engine.name()
        );

        let result = typeset(engine.as_mut(), sink.as_mut(), job.content.markup());
        let elapsed = started.elapsed();

        let result = match result {
            Ok(()) => {
                log::info!("Rendered job {} in {:?}", job.id, elapsed);
                Ok(())
            }
            Err(e) => {
                log::warn!("Render job {} failed after {:?}: {:#}", job.id, elapsed, e);
                Err(ErrorInfo::render(&e))
            }
        };

        let reply = RenderResult {
            job_id: job.id,
            result,
            elapsed,
        };
        if result_tx.send(reply).is_err() {
            break;
        }
    }
    log::debug!("Engine worker exiting");
}

/// Run the engine, turning a panic into an ordinary render failure
fn typeset(engine: &mut dyn TypesetEngine, sink: &mut dyn OutputSink, markup: &str) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.typeset(markup, sink))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(anyhow!("Typesetting engine panicked: {}", message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use mathpad_core::config::DelimiterConfig;
    use mathpad_core::{EditEvent, Transformer};

    struct EchoEngine;

    impl TypesetEngine for EchoEngine {
        fn typeset(&mut self, markup: &str, sink: &mut dyn OutputSink) -> Result<()> {
            if markup.contains("panic") {
                panic!("engine blew up");
            }
            if markup.contains("fail") {
                anyhow::bail!("cannot typeset");
            }
            sink.replace(markup)
        }
    }

    fn job(id: u64, text: &str) -> RenderJob {
        let transformer = Transformer::new(&DelimiterConfig::default());
        RenderJob {
            id,
            content: transformer.transform(&EditEvent::new(text)),
        }
    }

    fn recv(worker: &EngineWorker) -> RenderResult {
        worker
            .results()
            .recv_timeout(Duration::from_secs(5))
            .expect("worker result")
    }

    #[test]
    fn test_worker_renders_job() -> Result<()> {
        let sink = MemorySink::new();
        let worker = EngineWorker::spawn(Box::new(EchoEngine), Box::new(sink.clone()))?;

        worker.start(job(1, "$x$"))?;
        let result = recv(&worker);

        assert_eq!(result.job_id, 1);
        assert!(result.result.is_ok());
        assert_eq!(sink.contents().as_deref(), Some("<p>\\(x\\)</p>"));

        Ok(())
    }

    #[test]
    fn test_worker_reports_failure_and_keeps_running() -> Result<()> {
        let sink = MemorySink::new();
        let worker = EngineWorker::spawn(Box::new(EchoEngine), Box::new(sink.clone()))?;

        worker.start(job(1, "fail"))?;
        let failed = recv(&worker);
        let error = failed.result.unwrap_err();
        assert!(error.cause.contains("cannot typeset"));
        assert_eq!(sink.contents(), None);

        worker.start(job(2, "ok"))?;
        assert!(recv(&worker).result.is_ok());
        assert_eq!(sink.contents().as_deref(), Some("<p>ok</p>"));

        Ok(())
    }

    #[test]
    fn test_worker_survives_engine_panic() -> Result<()> {
        let sink = MemorySink::new();
        let worker = EngineWorker::spawn(Box::new(EchoEngine), Box::new(sink.clone()))?;

        worker.start(job(1, "panic"))?;
        let error = recv(&worker).result.unwrap_err();
        assert!(error.cause.contains("engine blew up"));

        worker.start(job(2, "after"))?;
        assert!(recv(&worker).result.is_ok());
        assert!(worker.results().try_recv().is_err());

        Ok(())
    }
}
