//! Mathpad Core - Live preview pipeline, independent of threads and I/O
//!
//! This crate contains the pure logic behind the mathpad preview:
//! - Delimiter transformer (raw text to canonical math markup)
//! - Debounced input coalescer
//! - Render queue coordinator (latest-wins state machine)
//! - Typed notification bus
//! - Document model, editor wrap commands, and configuration

pub mod bus;
pub mod commands;
pub mod config;
pub mod content;
pub mod debounce;
pub mod doc;
pub mod engine;
pub mod error;
pub mod queue;
pub mod transform;

// Re-export commonly used types
pub use bus::{Notification, NotificationBus, SubscriptionId, Topic};
pub use config::Config;
pub use content::{EditEvent, ProcessedContent};
pub use debounce::Debouncer;
pub use doc::Document;
pub use engine::{OutputSink, TypesetEngine};
pub use error::{ErrorCategory, ErrorInfo};
pub use queue::{Completion, QueueState, RenderJob, RenderOutcome, RenderQueue};
pub use transform::Transformer;
