//! Render queue coordinator
//!
//! A latest-wins state machine that serialises calls into a non-reentrant
//! typesetting engine. At most one job is in flight and at most one piece of
//! content waits behind it; a newer submission overwrites the waiting one.
//!
//! ```text
//!             submit                     drain
//!   Idle ─────────────────► Pending ─────────────► Running
//!    ▲                        ▲  ▲ submit (replace)  │   │
//!    │          complete      │  └──────             │   │ submit
//!    └────────────────────────┼──────────────────────┘   ▼
//!                             └──────────────── RunningWithPending
//!                                   complete        ▲  │ submit (replace)
//!                                                   └──┘
//! ```
//!
//! `Pending` only lasts longer than an instant while live preview is off.

use anyhow::{bail, Result};
use std::fmt;

use crate::content::ProcessedContent;
use crate::error::ErrorInfo;

/// Observable coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// No pending work, engine not running
    Idle,
    /// Content waiting, engine not invoked yet
    Pending,
    /// Engine invocation in flight
    Running,
    /// Engine in flight and newer content waiting behind it
    RunningWithPending,
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueueState::Idle => "idle",
            QueueState::Pending => "pending",
            QueueState::Running => "running",
            QueueState::RunningWithPending => "running-with-pending",
        };
        f.write_str(name)
    }
}

/// One engine invocation to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub id: u64,
    pub content: ProcessedContent,
}

/// Result of one engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub job_id: u64,
    pub success: bool,
    pub error: Option<ErrorInfo>,
}

/// What happened when a job completed, and what to run next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub outcome: RenderOutcome,
    pub next: Option<RenderJob>,
}

#[derive(Debug)]
pub struct RenderQueue {
    pending: Option<ProcessedContent>,
    in_flight: Option<u64>,
    live: bool,
    next_id: u64,
    invocations: u64,
    superseded: u64,
}

impl RenderQueue {
    pub fn new(live: bool) -> Self {
        Self {
            pending: None,
            in_flight: None,
            live,
            next_id: 1,
            invocations: 0,
            superseded: 0,
        }
    }

    pub fn state(&self) -> QueueState {
        match (self.in_flight.is_some(), self.pending.is_some()) {
            (false, false) => QueueState::Idle,
            (false, true) => QueueState::Pending,
            (true, false) => QueueState::Running,
            (true, true) => QueueState::RunningWithPending,
        }
    }

    /// Id of the job currently in flight
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Number of engine invocations started
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Number of submissions discarded before reaching the engine
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    /// Submit content; returns a job when the engine should be invoked now
    pub fn submit(&mut self, content: ProcessedContent) -> Option<RenderJob> {
        if self.pending.replace(content).is_some() {
            self.superseded += 1;
            log::debug!(
                "Superseded pending render content ({} superseded so far)",
                self.superseded
            );
        }
        self.drain()
    }

    /// Record the end of the in-flight job, success or failure alike
    pub fn complete(&mut self, job_id: u64, result: Result<(), ErrorInfo>) -> Result<Completion> {
        match self.in_flight {
            Some(id) if id == job_id => {}
            Some(id) => bail!("Completion for job {} while job {} is in flight", job_id, id),
            None => bail!("Completion for job {} with no job in flight", job_id),
        }
        self.in_flight = None;

        let outcome = match result {
            Ok(()) => RenderOutcome {
                job_id,
                success: true,
                error: None,
            },
            Err(error) => RenderOutcome {
                job_id,
                success: false,
                error: Some(error),
            },
        };

        Ok(Completion {
            outcome,
            next: self.drain(),
        })
    }

    /// Toggle live preview; turning it on drains any waiting content
    pub fn set_live(&mut self, live: bool) -> Option<RenderJob> {
        self.live = live;
        if live {
            self.drain()
        } else {
            None
        }
    }

    fn drain(&mut self) -> Option<RenderJob> {
        if !self.live || self.in_flight.is_some() {
            return None;
        }
        let content = self.pending.take()?;

        let id = self.next_id;
        self.next_id += 1;
        self.invocations += 1;
        self.in_flight = Some(id);

        Some(RenderJob { id, content })
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new(true)
    }
}
