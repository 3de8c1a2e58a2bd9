//! Config source loading (YAML or TOML).
//!
//! Sources are parsed into an untyped document tree and handed to the
//! validator unchanged. A missing source is an error here; malformed
//! content is the validator's business.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Yaml => f.write_str("YAML"),
            ConfigFormat::Toml => f.write_str("TOML"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config source not found: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config: {message}")]
    Parse { format: ConfigFormat, message: String },
}

/// A loaded, not yet validated, config document.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    document: Value,
    origin: Option<PathBuf>,
}

impl ConfigSource {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if path.as_os_str().is_empty() || !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let mut source = Self::parse(&content, ConfigFormat::from_path(path))?;
        source.origin = Some(path.to_path_buf());
        Ok(source)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, ConfigFormat::Yaml)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, ConfigFormat::Toml)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> ConfigResult<Self> {
        let document = if content.trim().is_empty() {
            Value::Null
        } else {
            match format {
                ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                    ConfigError::Parse {
                        format,
                        message: e.to_string(),
                    }
                })?,
                ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse {
                    format,
                    message: e.to_string(),
                })?,
            }
        };
        Ok(Self {
            document,
            origin: None,
        })
    }

    pub fn from_document(document: Value) -> Self {
        Self {
            document,
            origin: None,
        }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }

    /// The file this source was read from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = ConfigSource::from_file(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn empty_path_is_not_found() {
        let err = ConfigSource::from_file(Path::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn empty_yaml_is_null() {
        let source = ConfigSource::from_yaml_str("").unwrap();
        assert_eq!(source.document(), &Value::Null);
    }

    #[test]
    fn yaml_keeps_key_order() {
        let source = ConfigSource::from_yaml_str("zeta: 1\nalpha: 2\n").unwrap();
        let keys: Vec<_> = source.document().as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn toml_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "default_destination = \"waffles_default\"").unwrap();

        let source = ConfigSource::from_file(file.path()).unwrap();
        assert_eq!(
            source.document(),
            &json!({ "default_destination": "waffles_default" })
        );
        assert_eq!(source.origin(), Some(file.path()));
    }

    #[test]
    fn broken_yaml_is_parse_error() {
        let err = ConfigSource::from_yaml_str("tools: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: ConfigFormat::Yaml, .. }));
    }
}
