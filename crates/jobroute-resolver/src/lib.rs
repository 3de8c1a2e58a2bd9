//! jobroute-resolver — picks the destination a job should run on.
//!
//! # Components
//!
//! - **`resolver`** — rule scan, fallbacks, priority tiers
//! - **`matcher`** — rule predicates over measured facts
//! - **`measure`** — collaborator interfaces (`JobMeasurer`, `ToolDescriptor`, `HostDefaults`)
//! - **`fs`** — measuring inputs that live on local disk
//! - **`error`** — measurement and job-mapping errors

pub mod error;
pub mod fs;
pub mod matcher;
pub mod measure;
pub mod resolver;

use std::path::{Path, PathBuf};

use jobroute_core::{ConfigError, ConfigSource, DiagnosticSink};

pub use error::{JobMappingError, MappingResult, MeasureError, MeasureResult};
pub use fs::{FsInput, FsJob};
pub use measure::{HostDefaults, JobFacts, JobMeasurer, Measured, ToolDescriptor};
pub use resolver::Resolver;

/// Load, validate, and resolve in one call.
///
/// The config is read from `source`, or from the host's default rule
/// config when `source` is `None`. Validation diagnostics and the
/// resolution trail both go to `sink`, in that order.
pub fn map_tool_to_destination(
    job: &dyn JobMeasurer,
    host: &(impl HostDefaults + ?Sized),
    tool: &(impl ToolDescriptor + ?Sized),
    requester: &str,
    priority: bool,
    source: Option<&Path>,
    sink: &mut dyn DiagnosticSink,
) -> MappingResult<String> {
    let path = source
        .or_else(|| host.rule_config_path())
        .ok_or_else(|| ConfigError::NotFound(PathBuf::new()))?;
    let source = ConfigSource::from_file(path)?;

    let report = jobroute_validator::validate(source.document(), sink);
    Resolver::new(&report.config).resolve(job, tool.tool_id(), requester, priority, sink)
}
