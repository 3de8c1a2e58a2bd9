//! Filesystem-backed job measurement.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{MeasureError, MeasureResult};
use crate::measure::{JobMeasurer, Measured};

/// One job input. `path` is `None` for inputs that are not backed by a
/// file (those fail to measure).
#[derive(Debug, Clone)]
pub struct FsInput {
    pub name: String,
    pub path: Option<PathBuf>,
    /// Dataset format, e.g. `fasta` or `txt`.
    pub format: Option<String>,
    /// Record count from dataset metadata; counted from the file if unset.
    pub records: Option<u64>,
}

impl FsInput {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            format: None,
            records: None,
        }
    }

    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            format: None,
            records: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_records(mut self, records: u64) -> Self {
        self.records = Some(records);
        self
    }

    fn location(&self) -> String {
        self.path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    fn checked_path(&self) -> MeasureResult<&Path> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| MeasureError::NotAFile(self.name.clone()))?;
        if !path.exists() {
            return Err(MeasureError::MissingFile {
                name: self.name.clone(),
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(MeasureError::NotAFile(self.name.clone()));
        }
        Ok(path)
    }

    fn is_fasta(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("fasta"))
    }
}

/// A job whose inputs are files on local disk.
#[derive(Debug, Clone, Default)]
pub struct FsJob {
    pub inputs: Vec<FsInput>,
    pub arguments: Map<String, Value>,
}

impl FsJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: FsInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_argument(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.to_string(), value.into());
        self
    }
}

impl JobMeasurer for FsJob {
    fn input_sizes(&self) -> MeasureResult<Vec<Measured>> {
        self.inputs
            .iter()
            .map(|input| {
                let path = input.checked_path()?;
                let bytes = std::fs::metadata(path)
                    .map_err(|source| MeasureError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?
                    .len();
                Ok(Measured::new(&input.name, input.location(), bytes))
            })
            .collect()
    }

    fn record_counts(&self) -> MeasureResult<Vec<Measured>> {
        self.inputs
            .iter()
            .map(|input| {
                let path = input.checked_path()?;
                let records = match input.records {
                    Some(records) => records,
                    None => count_records(path, input.is_fasta())?,
                };
                Ok(Measured::new(&input.name, input.location(), records))
            })
            .collect()
    }

    fn input_dataset_count(&self) -> usize {
        self.inputs.len()
    }

    fn tool_arguments(&self) -> Map<String, Value> {
        self.arguments.clone()
    }
}

/// FASTA files count `>` headers; anything else counts lines.
fn count_records(path: &Path, fasta: bool) -> MeasureResult<u64> {
    let read_err = |source| MeasureError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(read_err)?);

    // Lines are raw bytes; inputs need not be UTF-8.
    let mut count = 0;
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).map_err(read_err)? == 0 {
            break;
        }
        if !fasta || line.first() == Some(&b'>') {
            count += 1;
        }
    }
    trace!(path = %path.display(), fasta, count, "counted records");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        write_temp_bytes(content.as_bytes())
    }

    fn write_temp_bytes(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn sizes_come_from_metadata() {
        let file = write_temp("abcdef");
        let job = FsJob::new().with_input(FsInput::file("input1", file.path()));
        let sizes = job.input_sizes().unwrap();
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].value, 6);
        assert_eq!(sizes[0].location, file.path().display().to_string());
    }

    #[test]
    fn fasta_counts_headers() {
        let file = write_temp(">one\nACGT\n>two\nGGCC\n>three\nTT\n");
        let job = FsJob::new().with_input(FsInput::file("input1", file.path()).with_format("fasta"));
        assert_eq!(job.record_counts().unwrap()[0].value, 3);
    }

    #[test]
    fn plain_text_counts_lines() {
        let file = write_temp("a\nb\nc\n");
        let job = FsJob::new().with_input(FsInput::file("input1", file.path()).with_format("txt"));
        assert_eq!(job.record_counts().unwrap()[0].value, 3);
    }

    #[test]
    fn non_utf8_lines_still_count() {
        let file = write_temp_bytes(b"line one\n\xff\xfe binary\nline three\n");
        let job = FsJob::new().with_input(FsInput::file("input1", file.path()).with_format("txt"));
        assert_eq!(job.record_counts().unwrap()[0].value, 3);

        let file = write_temp_bytes(b">one\n\xffACGT\n>\xfetwo\nGG");
        let job = FsJob::new().with_input(FsInput::file("input1", file.path()).with_format("fasta"));
        assert_eq!(job.record_counts().unwrap()[0].value, 2);
    }

    #[test]
    fn last_line_without_newline_counts() {
        let file = write_temp("a\nb");
        let job = FsJob::new().with_input(FsInput::file("input1", file.path()).with_format("txt"));
        assert_eq!(job.record_counts().unwrap()[0].value, 2);
    }

    #[test]
    fn metadata_records_win() {
        let file = write_temp(">one\n");
        let job = FsJob::new().with_input(
            FsInput::file("input1", file.path())
                .with_format("fasta")
                .with_records(10),
        );
        assert_eq!(job.record_counts().unwrap()[0].value, 10);
    }

    #[test]
    fn missing_file() {
        let job = FsJob::new().with_input(FsInput::file("input1", "/definitely/not/here.full"));
        assert!(matches!(
            job.input_sizes(),
            Err(MeasureError::MissingFile { .. })
        ));
    }

    #[test]
    fn detached_and_directory_inputs_are_not_files() {
        let dir = tempfile::tempdir().unwrap();
        for input in [FsInput::detached("input1"), FsInput::file("input1", dir.path())] {
            let job = FsJob::new().with_input(input);
            assert!(matches!(job.input_sizes(), Err(MeasureError::NotAFile(_))));
        }
    }
}
