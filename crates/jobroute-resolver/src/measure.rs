//! Collaborator interfaces the resolver calls into.
//!
//! The resolver never touches job inputs itself. Hosts implement
//! [`JobMeasurer`] over whatever they know about a job; [`JobFacts`] covers
//! hosts that measured everything up front, and `FsJob` measures files on
//! disk.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::MeasureResult;

/// One measured job input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measured {
    /// Input name as the tool declares it, e.g. `input1`.
    pub name: String,
    /// Where the input lives; shown in the trail right after the name.
    pub location: String,
    pub value: u64,
}

impl Measured {
    pub fn new(name: impl Into<String>, location: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            value,
        }
    }
}

/// Measurements of a single job.
pub trait JobMeasurer {
    /// Byte size of each input, in declaration order.
    fn input_sizes(&self) -> MeasureResult<Vec<Measured>>;

    /// Record count of each input, in declaration order.
    fn record_counts(&self) -> MeasureResult<Vec<Measured>>;

    fn input_dataset_count(&self) -> usize;

    /// Argument values the job was submitted with.
    fn tool_arguments(&self) -> Map<String, Value>;
}

/// The tool a job runs.
pub trait ToolDescriptor {
    fn tool_id(&self) -> &str;
}

impl ToolDescriptor for str {
    fn tool_id(&self) -> &str {
        self
    }
}

impl ToolDescriptor for String {
    fn tool_id(&self) -> &str {
        self
    }
}

/// Host-level settings consulted when the caller leaves them out.
pub trait HostDefaults {
    /// Config source used when no explicit one is given.
    fn rule_config_path(&self) -> Option<&Path>;
}

impl HostDefaults for Path {
    fn rule_config_path(&self) -> Option<&Path> {
        Some(self)
    }
}

/// Pre-measured job, for hosts that already know their numbers.
#[derive(Debug, Clone, Default)]
pub struct JobFacts {
    pub sizes: Vec<Measured>,
    pub records: Vec<Measured>,
    /// Defaults to the number of sized inputs when unset.
    pub dataset_count: Option<usize>,
    pub arguments: Map<String, Value>,
}

impl JobFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, name: &str, location: &str, bytes: u64) -> Self {
        self.sizes.push(Measured::new(name, location, bytes));
        self
    }

    pub fn with_records(mut self, name: &str, location: &str, records: u64) -> Self {
        self.records.push(Measured::new(name, location, records));
        self
    }

    pub fn with_dataset_count(mut self, count: usize) -> Self {
        self.dataset_count = Some(count);
        self
    }

    pub fn with_argument(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.to_string(), value.into());
        self
    }
}

impl JobMeasurer for JobFacts {
    fn input_sizes(&self) -> MeasureResult<Vec<Measured>> {
        Ok(self.sizes.clone())
    }

    fn record_counts(&self) -> MeasureResult<Vec<Measured>> {
        Ok(self.records.clone())
    }

    fn input_dataset_count(&self) -> usize {
        self.dataset_count.unwrap_or(self.sizes.len())
    }

    fn tool_arguments(&self) -> Map<String, Value> {
        self.arguments.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_count_defaults_to_inputs() {
        let facts = JobFacts::new()
            .with_size("input1", "/data/a", 10)
            .with_size("input2", "/data/b", 20);
        assert_eq!(facts.input_dataset_count(), 2);
        assert_eq!(facts.with_dataset_count(5).input_dataset_count(), 5);
    }

    #[test]
    fn str_is_a_tool() {
        assert_eq!("spades".tool_id(), "spades");
        assert_eq!(String::from("smalt").tool_id(), "smalt");
    }
}
