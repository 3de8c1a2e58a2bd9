use std::path::Path;

use anyhow::{Context, anyhow};
use jobroute_core::TracingSink;
use jobroute_resolver::{FsInput, FsJob, map_tool_to_destination};
use serde_json::Value;
use tracing::debug;

pub fn resolve(
    config: &str,
    tool: &str,
    user: &str,
    priority: bool,
    inputs: &[String],
    args: &[String],
) -> anyhow::Result<()> {
    let job = build_job(inputs, args)?;
    debug!(
        tool,
        inputs = job.inputs.len(),
        arguments = job.arguments.len(),
        "resolving job"
    );

    let config_path = Path::new(config);
    let destination = map_tool_to_destination(
        &job,
        config_path,
        tool,
        user,
        priority,
        None,
        &mut TracingSink,
    )
    .map_err(|err| anyhow!(err.reason()))
    .with_context(|| format!("could not route '{tool}'"))?;

    println!("{destination}");
    Ok(())
}

fn build_job(inputs: &[String], args: &[String]) -> anyhow::Result<FsJob> {
    let mut job = FsJob::new();
    for raw in inputs {
        let (name, path) = split_pair(raw, "--input")?;
        let mut input = FsInput::file(name, path);
        if is_fasta(Path::new(path)) {
            input = input.with_format("fasta");
        }
        job = job.with_input(input);
    }
    for raw in args {
        let (key, value) = split_pair(raw, "--arg")?;
        job = job.with_argument(key, parse_argument(value));
    }
    Ok(job)
}

fn split_pair<'a>(raw: &'a str, flag: &str) -> anyhow::Result<(&'a str, &'a str)> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| anyhow!("{flag} expects key=value, got '{raw}'"))
}

/// `true`, `3`, `{"a": 1}` become JSON values; anything else stays a string.
fn parse_argument(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw))
}

fn is_fasta(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("fasta") || ext.eq_ignore_ascii_case("fa"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pairs_split_on_first_equals() {
        assert_eq!(split_pair("k=a=b", "--arg").unwrap(), ("k", "a=b"));
        assert!(split_pair("novalue", "--arg").is_err());
        assert!(split_pair("=x", "--arg").is_err());
    }

    #[test]
    fn arguments_parse_as_json_when_possible() {
        assert_eq!(parse_argument("true"), json!(true));
        assert_eq!(parse_argument("21"), json!(21));
        assert_eq!(parse_argument("careful"), json!("careful"));
    }

    #[test]
    fn fasta_by_extension() {
        assert!(is_fasta(Path::new("reads.FASTA")));
        assert!(is_fasta(Path::new("reads.fa")));
        assert!(!is_fasta(Path::new("reads.txt")));
    }

    #[test]
    fn job_from_flags() {
        let job = build_job(
            &["input1=/data/reads.fasta".to_string()],
            &["careful=true".to_string()],
        )
        .unwrap();
        assert_eq!(job.inputs.len(), 1);
        assert_eq!(job.inputs[0].format.as_deref(), Some("fasta"));
        assert_eq!(job.arguments["careful"], json!(true));
    }
}
