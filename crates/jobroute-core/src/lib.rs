//! jobroute-core — shared types for rule-based job routing.
//!
//! - **`units`** — human-readable byte sizes
//! - **`types`** — the normalized routing config (tiers, bounds, rules)
//! - **`diagnostics`** — the ordered diagnostic trail and its sinks
//! - **`config`** — loading YAML/TOML config sources

pub mod config;
pub mod diagnostics;
pub mod types;
pub mod units;

pub use config::{ConfigError, ConfigFormat, ConfigResult, ConfigSource};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, TracingSink, Trail};
pub use types::*;
pub use units::{UnitError, format_bytes, format_size, parse_size, parse_size_value};
