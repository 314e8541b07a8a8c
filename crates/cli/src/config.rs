//! `--config FILE`: TOML defaults for reading and writing. Command-line
//! flags are applied on top by the caller.

use odb_core::{LineEnding, OdbError, ReadOptions};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub read: ReadOptions,
    pub write: WriteConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteConfig {
    pub line_ending: LineEnding,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, OdbError> {
        let text = std::fs::read_to_string(path).map_err(|e| OdbError::io("read", path, e))?;
        Config::from_toml(&text)
            .map_err(|e| OdbError::Config(format!("{}: {}", path.display(), e)))
    }

    fn from_toml(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    /// The file at `path` when given, built-in defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, OdbError> {
        match path {
            Some(p) => {
                let config = Config::load(p)?;
                tracing::debug!(path = %p.display(), ?config, "loaded config");
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odb_core::DEFAULT_MAX_WARNINGS;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml("[read]\nmax_errors = 3\n").unwrap();
        assert_eq!(config.read.max_errors, 3);
        assert_eq!(config.read.max_warnings, DEFAULT_MAX_WARNINGS);
        assert_eq!(config.write.line_ending, LineEnding::Lf);
    }

    #[test]
    fn full_file() {
        let config = Config::from_toml(
            "[read]\nmax_errors = 10\nmax_warnings = 5\ncontinue_on_error = true\n\n[write]\nline_ending = \"cr\"\n",
        )
        .unwrap();
        assert!(config.read.continue_on_error);
        assert_eq!(config.read.max_warnings, 5);
        assert_eq!(config.write.line_ending, LineEnding::Cr);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("[read]\nmax_error = 3\n").is_err());
        assert!(Config::from_toml("[output]\n").is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load(Path::new("/nonexistent/odb.toml")).unwrap_err();
        assert!(matches!(err, OdbError::Io { op: "read", .. }));
    }
}
