//! Seams to the external typesetting engine and the output surface

use anyhow::Result;

/// The single surface that each successful render fully replaces
pub trait OutputSink: Send {
    fn replace(&mut self, rendered: &str) -> Result<()>;
}

/// An external typesetter.
///
/// Implementations are not assumed to be reentrant: callers must wait for
/// one `typeset` call to return before making the next. An implementation
/// writes to the sink only once its output is complete, so a failure leaves
/// the previous output untouched.
pub trait TypesetEngine: Send {
    fn typeset(&mut self, markup: &str, sink: &mut dyn OutputSink) -> Result<()>;

    /// Short name used in log messages
    fn name(&self) -> &str {
        "engine"
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn replace(&mut self, rendered: &str) -> Result<()> {
        (**self).replace(rendered)
    }
}

impl<E: TypesetEngine + ?Sized> TypesetEngine for Box<E> {
    fn typeset(&mut self, markup: &str, sink: &mut dyn OutputSink) -> Result<()> {
        (**self).typeset(markup, sink)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
