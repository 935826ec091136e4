//! Requests sent to the preview pipeline thread

use crossbeam_channel::Sender;
use mathpad_core::{EditEvent, ErrorInfo, QueueState};

/// Snapshot of the coordinator, taken on the pipeline thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    pub state: QueueState,
    pub live: bool,
    /// Engine invocations started so far
    pub invocations: u64,
    /// Submissions discarded by the latest-wins policy
    pub superseded: u64,
    /// Jobs that outlived the stall warning threshold
    pub stalled: u64,
}

/// Pipeline requests
#[derive(Debug)]
pub enum PipelineRequest {
    /// Raw edit; passes through both debounce stages
    Edit(EditEvent),
    /// Whole-document load; skips the raw edit stage
    Load(EditEvent),
    /// Settle both debounce stages now
    Flush,
    /// Toggle live preview
    SetLive(bool),
    /// Publish an error raised outside the pipeline
    Report(ErrorInfo),
    /// Reply with a status snapshot
    Status(Sender<QueueStatus>),
    Shutdown,
}
