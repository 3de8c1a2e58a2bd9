//! jobroute-validator — turns a hand-written routing document into a
//! [`RouteConfig`].
//!
//! Validation never fails on content. Every malformed field is repaired,
//! defaulted, or dropped, and each of those decisions is reported to the
//! diagnostic sink. Only the document source itself can be missing, and
//! that is reported by `jobroute_core::ConfigSource` before we get here.
//!
//! # Components
//!
//! - **`validator`** — root categories, global defaults, tool entries
//! - **`rules`** — per-rule checks (type, bounds, nice value, destination)
//! - **`users`** — requester lists on rules and the root `users` section

mod rules;
mod users;
mod validator;

use jobroute_core::{DiagnosticSink, RouteConfig};
use serde_json::Value;

pub use validator::MALFORMED_ROOT;

/// How the validator treats problems it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Repair or drop, report each decision with its correction.
    Normalize,
    /// Report problems only. Repairs that later checks would observe are
    /// not applied, and the start/finish lines are not emitted.
    Check,
}

/// Result of a validation pass.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub config: RouteConfig,
    /// Number of corrective diagnostics emitted.
    pub corrections: usize,
}

impl ValidationReport {
    /// True when the document was already canonical.
    pub fn is_clean(&self) -> bool {
        self.corrections == 0
    }
}

/// Validate and normalize a raw config document.
pub fn validate(document: &Value, sink: &mut dyn DiagnosticSink) -> ValidationReport {
    validator::run(document, Mode::Normalize, sink)
}

/// Fast "is this config clean" check. Problems are reported without
/// correction suffixes.
pub fn check(document: &Value, sink: &mut dyn DiagnosticSink) -> bool {
    validator::run(document, Mode::Check, sink).is_clean()
}
