//! The preview pipeline thread
//!
//! One thread owns both debounce stages, the transformer, the render queue
//! and the notification bus, so none of that state needs a lock. The engine
//! itself runs on the [`EngineWorker`] thread and reports back over a channel.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{select, Receiver, Sender};
use mathpad_core::{
    Completion, Config, Debouncer, EditEvent, ErrorInfo, Notification, NotificationBus,
    OutputSink, RenderJob, RenderQueue, Transformer, TypesetEngine,
};
use std::thread;
use std::time::{Duration, Instant};

use crate::event::{PipelineRequest, QueueStatus};
use crate::worker::{EngineWorker, RenderResult};

/// Handle to a running pipeline
pub struct PipelineHandle {
    request_tx: Sender<PipelineRequest>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Entry point for building a pipeline
pub struct Pipeline;

impl Pipeline {
    /// Spawn a pipeline wired to the given engine, sink and bus.
    ///
    /// The configuration is copied; later changes do not affect this pipeline.
    pub fn spawn(
        config: &Config,
        engine: Box<dyn TypesetEngine>,
        sink: Box<dyn OutputSink>,
        bus: NotificationBus,
    ) -> Result<PipelineHandle> {
        let worker = EngineWorker::spawn(engine, sink)?;
        let (request_tx, request_rx) = crossbeam_channel::unbounded();

        let actor = PipelineActor {
            input: Debouncer::new(config.preview.input_debounce()),
            render: Debouncer::new(config.preview.render_debounce()),
            transformer: Transformer::new(&config.delimiters),
            queue: RenderQueue::new(config.preview.live),
            bus,
            worker,
            stall_warning: config.preview.stall_warning(),
            in_flight_since: None,
            stall_reported: false,
            stalls: 0,
        };

        let thread = thread::Builder::new()
            .name("mathpad-pipeline".to_string())
            .spawn(move || actor.run(request_rx))
            .context("Failed to spawn preview pipeline thread")?;

        Ok(PipelineHandle {
            request_tx,
            thread: Some(thread),
        })
    }
}

impl PipelineHandle {
    /// Feed a raw edit
    pub fn edit(&self, event: EditEvent) -> Result<()> {
        self.send(PipelineRequest::Edit(event))
    }

    /// Load a whole document, skipping the raw edit debounce
    pub fn load(&self, event: EditEvent) -> Result<()> {
        self.send(PipelineRequest::Load(event))
    }

    /// Settle any debounced content immediately
    pub fn flush(&self) -> Result<()> {
        self.send(PipelineRequest::Flush)
    }

    pub fn set_live(&self, live: bool) -> Result<()> {
        self.send(PipelineRequest::SetLive(live))
    }

    /// Publish an error on the pipeline's bus
    pub fn report(&self, error: ErrorInfo) -> Result<()> {
        self.send(PipelineRequest::Report(error))
    }

    /// Status snapshot, taken after every earlier request has been handled
    pub fn status(&self) -> Result<QueueStatus> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.send(PipelineRequest::Status(tx))?;
        rx.recv().map_err(|_| anyhow!("Preview pipeline has stopped"))
    }

    /// Stop the pipeline and wait for its thread to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        let _ = self.request_tx.send(PipelineRequest::Shutdown);
        thread
            .join()
            .map_err(|_| anyhow!("Preview pipeline thread panicked"))
    }

    fn send(&self, request: PipelineRequest) -> Result<()> {
        self.request_tx
            .send(request)
            .map_err(|_| anyhow!("Preview pipeline has stopped"))
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("{:#}", e);
        }
    }
}

struct PipelineActor {
    input: Debouncer,
    render: Debouncer,
    transformer: Transformer,
    queue: RenderQueue,
    bus: NotificationBus,
    worker: EngineWorker,
    stall_warning: Duration,
    in_flight_since: Option<Instant>,
    stall_reported: bool,
    stalls: u64,
}

impl PipelineActor {
    fn run(mut self, requests: Receiver<PipelineRequest>) {
        log::info!("Preview pipeline started");
        let results = self.worker.results().clone();

        loop {
            let now = Instant::now();
            self.fire_due_timers(now);
            self.check_stall(now);

            let timer = match self.next_deadline() {
                Some(deadline) => crossbeam_channel::at(deadline),
                None => crossbeam_channel::never(),
            };

            select! {
                recv(requests) -> request => match request {
                    Ok(PipelineRequest::Shutdown) | Err(_) => break,
                    Ok(request) => self.handle_request(request),
                },
                recv(results) -> result => match result {
                    Ok(result) => self.handle_result(result),
                    Err(_) => {
                        log::error!("Engine worker exited, stopping preview pipeline");
                        break;
                    }
                },
                recv(timer) -> _ => {}
            }
        }

        if self.input.has_pending() || self.render.has_pending() {
            log::debug!("Discarding edits that had not settled");
        }
        log::info!(
            "Preview pipeline stopped ({} renders, {} superseded)",
            self.queue.invocations(),
            self.queue.superseded()
        );
    }

    fn handle_request(&mut self, request: PipelineRequest) {
        let now = Instant::now();
        match request {
            PipelineRequest::Edit(event) => {
                self.input.push(event, now);
            }
            PipelineRequest::Load(event) => {
                // A loaded document replaces any raw edit still settling
                self.input.cancel();
                self.render.push(event, now);
            }
            PipelineRequest::Flush => {
                if let Some(event) = self.input.flush() {
                    self.render.push(event, now);
                }
                if let Some(event) = self.render.flush() {
                    self.submit(event);
                }
            }
            PipelineRequest::SetLive(live) => {
                log::info!("Live preview {}", if live { "enabled" } else { "disabled" });
                if let Some(job) = self.queue.set_live(live) {
                    self.start(job);
                }
            }
            PipelineRequest::Report(error) => {
                self.bus.publish(&Notification::Error(error));
            }
            PipelineRequest::Status(reply) => {
                let _ = reply.send(QueueStatus {
                    state: self.queue.state(),
                    live: self.queue.is_live(),
                    invocations: self.queue.invocations(),
                    superseded: self.queue.superseded(),
                    stalled: self.stalls,
                });
            }
            PipelineRequest::Shutdown => {}
        }
    }

    fn fire_due_timers(&mut self, now: Instant) {
        if let Some(event) = self.input.poll(now) {
            log::debug!("Input settled ({} bytes)", event.as_str().len());
            self.render.push(event, now);
        }
        if let Some(event) = self.render.poll(now) {
            self.submit(event);
        }
    }

    fn submit(&mut self, event: EditEvent) {
        let content = self.transformer.transform(&event);
        log::debug!("Submitting {} bytes of markup", content.len());
        if let Some(job) = self.queue.submit(content) {
            self.start(job);
        }
    }

    fn start(&mut self, job: RenderJob) {
        let job_id = job.id;
        self.in_flight_since = Some(Instant::now());
        self.stall_reported = false;

        if let Err(e) = self.worker.start(job) {
            log::error!("Failed to start render job {}: {:#}", job_id, e);
            self.finish(job_id, Err(ErrorInfo::render(&e)));
        }
    }

    fn handle_result(&mut self, result: RenderResult) {
        log::debug!("Job {} returned after {:?}", result.job_id, result.elapsed);
        self.finish(result.job_id, result.result);
    }

    fn finish(&mut self, job_id: u64, result: Result<(), ErrorInfo>) {
        match self.queue.complete(job_id, result) {
            Ok(Completion { outcome, next }) => {
                self.in_flight_since = None;
                self.bus.publish(&Notification::from_outcome(&outcome));
                if let Some(job) = next {
                    self.start(job);
                }
            }
            Err(e) => log::warn!("Ignoring engine result: {:#}", e),
        }
    }

    fn stall_deadline(&self) -> Option<Instant> {
        if self.stall_reported {
            return None;
        }
        self.in_flight_since.map(|since| since + self.stall_warning)
    }

    fn check_stall(&mut self, now: Instant) {
        let Some(deadline) = self.stall_deadline() else {
            return;
        };
        if now >= deadline {
            self.stall_reported = true;
            self.stalls += 1;
            log::warn!(
                "Render job {} has not finished after {:?}; later renders wait until it does",
                self.queue.in_flight().unwrap_or_default(),
                self.stall_warning
            );
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        [
            self.input.deadline(),
            self.render.deadline(),
            self.stall_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }
}
