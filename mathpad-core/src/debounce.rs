//! Debounced input coalescing
//!
//! The debouncer never reads the clock itself; callers pass `now` in, which
//! keeps it deterministic under test and lets a runtime sleep until
//! [`Debouncer::deadline`].

use crate::content::EditEvent;
use std::time::{Duration, Instant};

/// Coalesces a rapid stream of edit events into settled events
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<(EditEvent, Instant)>,
    last_settled: Option<EditEvent>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            last_settled: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Record an edit event, restarting the quiet period.
    ///
    /// Returns false when the event repeats the newest known content
    /// (pending, or last settled when nothing is pending); such events
    /// neither restart nor complete a timer cycle.
    pub fn push(&mut self, event: EditEvent, now: Instant) -> bool {
        let newest = match &self.pending {
            Some((pending, _)) => Some(pending),
            None => self.last_settled.as_ref(),
        };
        if newest == Some(&event) {
            return false;
        }

        self.pending = Some((event, now + self.quiet));
        true
    }

    /// Instant at which the pending event settles
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Emit the pending event if its quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<EditEvent> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.settle(),
            _ => None,
        }
    }

    /// Emit the pending event immediately, if any
    pub fn flush(&mut self) -> Option<EditEvent> {
        self.settle()
    }

    /// Drop the pending event without emitting it
    pub fn cancel(&mut self) -> Option<EditEvent> {
        self.pending.take().map(|(event, _)| event)
    }

    fn settle(&mut self) -> Option<EditEvent> {
        let (event, _) = self.pending.take()?;
        self.last_settled = Some(event.clone());
        Some(event)
    }
}
