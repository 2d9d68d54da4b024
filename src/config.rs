// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Process configuration
//!
//! Loaded once by the entry point and passed by reference to whatever needs
//! it. Lookup order: an explicit `--config` path, `./flowdef.toml`, then the
//! user config directory (`~/.config/flowdef/config.toml` on Linux).
//!
//! ```toml
//! [definitions]
//! duplicate_edges = "reject"   # or "ignore"
//! max_repeat = 1000
//! parse_budget = "2s"
//!
//! [logging]
//! filter = "flowdef=info"
//! file = "logs/flowdef.log"
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{FlowError, FlowResult};
use crate::pipeline::DEFAULT_MAX_REPEAT;

/// Project-local config file name
pub const CONFIG_FILE: &str = "flowdef.toml";

/// What `add_dependency` does with an edge that already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateEdgePolicy {
    /// Fail with `DuplicateEdge`
    #[default]
    Reject,
    /// Treat the repeat as a no-op
    Ignore,
}

/// Settings that shape how definitions are built and loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionOptions {
    pub duplicate_edges: DuplicateEdgePolicy,
    /// Upper bound on `range(N)` in command templates
    pub max_repeat: usize,
    /// Parsing a definition file slower than this logs a warning
    #[serde(with = "humantime_text")]
    pub parse_budget: Duration,
}

impl Default for DefinitionOptions {
    fn default() -> Self {
        Self {
            duplicate_edges: DuplicateEdgePolicy::default(),
            max_repeat: DEFAULT_MAX_REPEAT,
            parse_budget: Duration::from_secs(2),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Optional JSON log file
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "flowdef=info".to_string(),
            file: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowdefConfig {
    pub definitions: DefinitionOptions,
    pub logging: LoggingConfig,
}

impl FlowdefConfig {
    /// Resolve and load the configuration
    pub fn load(explicit: Option<&Path>) -> FlowResult<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(FlowError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            return Self::from_file(path);
        }

        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Self::from_file(&local);
        }

        match Self::user_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `config.toml` in the platform config directory
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "flowdef").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn from_file(path: &Path) -> FlowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FlowError::FileRead {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> FlowResult<Self> {
        let config: Self = toml::from_str(content)?;
        if config.definitions.max_repeat == 0 {
            return Err(FlowError::Config {
                message: "definitions.max_repeat must be at least 1".into(),
            });
        }
        Ok(config)
    }
}

/// Durations written as humantime text (`"2s"`, `"1m 30s"`)
mod humantime_text {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = FlowdefConfig::from_toml("").unwrap();
        assert_eq!(config, FlowdefConfig::default());
        assert_eq!(config.definitions.duplicate_edges, DuplicateEdgePolicy::Reject);
    }

    #[test]
    fn test_parse_full_config() {
        let config = FlowdefConfig::from_toml(
            r#"
[definitions]
duplicate_edges = "ignore"
max_repeat = 50
parse_budget = "500ms"

[logging]
filter = "flowdef=debug"
file = "logs/flowdef.log"
"#,
        )
        .unwrap();

        assert_eq!(config.definitions.duplicate_edges, DuplicateEdgePolicy::Ignore);
        assert_eq!(config.definitions.max_repeat, 50);
        assert_eq!(config.definitions.parse_budget, Duration::from_millis(500));
        assert_eq!(config.logging.file, Some(PathBuf::from("logs/flowdef.log")));
    }

    #[test]
    fn test_rejects_zero_repeat() {
        let result = FlowdefConfig::from_toml("[definitions]\nmax_repeat = 0\n");
        assert!(matches!(result, Err(FlowError::Config { .. })));
    }

    #[test]
    fn test_bad_policy_is_toml_error() {
        let result = FlowdefConfig::from_toml("[definitions]\nduplicate_edges = \"sometimes\"\n");
        assert!(matches!(result, Err(FlowError::Toml { .. })));
    }

    #[test]
    fn test_explicit_missing_file() {
        let result = FlowdefConfig::load(Some(Path::new("/nonexistent/flowdef.toml")));
        assert!(matches!(result, Err(FlowError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[definitions]\nmax_repeat = 7\n").unwrap();

        let config = FlowdefConfig::load(Some(&path)).unwrap();
        assert_eq!(config.definitions.max_repeat, 7);
    }
}
