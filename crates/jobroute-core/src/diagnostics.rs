//! Diagnostic trail for validation and resolution.
//!
//! Validation and resolution report every decision they take as an ordered
//! stream of messages. The stream is part of the contract (hosts and tests
//! read it), so it goes to an injected [`DiagnosticSink`] instead of a
//! process-wide logger. [`TracingSink`] bridges it to `tracing` for binaries.

use tracing::Level;

/// Target used when diagnostics are forwarded to `tracing`.
pub const TRACE_TARGET: &str = "jobroute";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

impl Diagnostic {
    pub fn debug(message: impl Into<String>) -> Self {
        Self {
            level: Level::DEBUG,
            message: message.into(),
        }
    }
}

/// Append-only receiver of diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// In-memory sink that keeps diagnostics in emission order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.message.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DiagnosticSink for Diagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }
}

/// Forwards every diagnostic to `tracing` at its own level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        let message = diagnostic.message;
        match diagnostic.level {
            Level::ERROR => tracing::error!(target: TRACE_TARGET, "{message}"),
            Level::WARN => tracing::warn!(target: TRACE_TARGET, "{message}"),
            Level::INFO => tracing::info!(target: TRACE_TARGET, "{message}"),
            Level::DEBUG => tracing::debug!(target: TRACE_TARGET, "{message}"),
            _ => tracing::trace!(target: TRACE_TARGET, "{message}"),
        }
    }
}

/// A sink gated by the config's `verbose` flag.
///
/// `note` only reaches the sink when verbose; `always` always does.
pub struct Trail<'a> {
    sink: &'a mut dyn DiagnosticSink,
    verbose: bool,
}

impl<'a> Trail<'a> {
    pub fn new(sink: &'a mut dyn DiagnosticSink, verbose: bool) -> Self {
        Self { sink, verbose }
    }

    pub fn note(&mut self, message: impl Into<String>) {
        if self.verbose {
            self.sink.emit(Diagnostic::debug(message));
        }
    }

    pub fn always(&mut self, message: impl Into<String>) {
        self.sink.emit(Diagnostic::debug(message));
    }
}
