//! Engine configuration, loadable from the `[engine]` table of a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mutation::WritePolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Policy for writes that do not name one.
    pub default_policy: WritePolicy,
    /// Cap on queued writes processed while settling one mutation.
    pub max_settle_writes: usize,
    pub log_parse_failures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_policy: WritePolicy::Create,
            max_settle_writes: 1024,
            log_parse_failures: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(file.engine)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_uses_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_table_overrides_fields() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [engine]
            default_policy = "existing"
            max_settle_writes = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.default_policy, WritePolicy::Existing);
        assert_eq!(cfg.max_settle_writes, 8);
        assert!(cfg.log_parse_failures);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = EngineConfig::from_toml_str("[engine]\ndefault_policy = \"sometimes\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::load(Path::new("/nonexistent/tether.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tether.toml"));
    }
}
