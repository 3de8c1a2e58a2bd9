use std::path::Path;

use jobroute_core::{ConfigSource, TracingSink};
use tracing::info;

use crate::OutputFormat;

pub fn validate(path: &str, check: bool, format: OutputFormat) -> anyhow::Result<()> {
    let source = ConfigSource::from_file(Path::new(path))?;
    let mut sink = TracingSink;

    if check {
        let clean = jobroute_validator::check(source.document(), &mut sink);
        println!("{}", if clean { "clean" } else { "dirty" });
        if !clean {
            anyhow::bail!("config '{path}' needs normalization");
        }
        return Ok(());
    }

    let report = jobroute_validator::validate(source.document(), &mut sink);
    info!(
        path,
        tools = report.config.tools.len(),
        corrections = report.corrections,
        "validated config"
    );

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.config)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&report.config)?);
        }
    }

    Ok(())
}
