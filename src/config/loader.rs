use crate::config::schema::{LocatorConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a config being loaded came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Inline,
    File(PathBuf),
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Inline => f.write_str("inline locator config"),
            ConfigOrigin::File(path) => write!(f, "locator config {}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read locator config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin} is not valid TOML: {source}")]
    Toml {
        origin: ConfigOrigin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("{origin} is invalid:\n{source}")]
    Validation {
        origin: ConfigOrigin,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// The file the error refers to, if it came from one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. } => Some(path),
            ConfigError::Toml { origin, .. } | ConfigError::Validation { origin, .. } => {
                match origin {
                    ConfigOrigin::File(path) => Some(path),
                    ConfigOrigin::Inline => None,
                }
            }
        }
    }
}

fn parse(input: &str, origin: ConfigOrigin) -> Result<LocatorConfig, ConfigError> {
    let config: LocatorConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Toml { origin, source }),
    };
    if let Err(source) = config.validate() {
        tracing::debug!(issues = source.issues.len(), %origin, "rejected locator config");
        return Err(ConfigError::Validation { origin, source });
    }
    Ok(config)
}

pub fn load_from_str(input: &str) -> Result<LocatorConfig, ConfigError> {
    parse(input, ConfigOrigin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<LocatorConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, ConfigOrigin::File(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_errors_have_no_path() {
        let err = load_from_str("[conditions\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Toml {
                origin: ConfigOrigin::Inline,
                ..
            }
        ));
        assert!(err.path().is_none());
        assert!(err
            .to_string()
            .starts_with("inline locator config is not valid TOML"));
    }

    #[test]
    fn validation_error_lists_issues() {
        let err = load_from_str("[conditions]\nactive = [\"A\", \"A\"]\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "inline locator config is invalid:\ncondition 'A' is listed more than once"
        );
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = load_from_str("[matcher]\nresolve_in_strings = \"yes\"\n").unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn origin_display() {
        let origin = ConfigOrigin::File(PathBuf::from("locator.toml"));
        assert_eq!(origin.to_string(), "locator config locator.toml");
    }
}
