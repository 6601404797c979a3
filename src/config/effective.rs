//! Effective configuration with provenance
//!
//! Records the merged configuration plus where each contributing layer
//! came from, so a run can show why a module ended up on a given SDK.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::policy::EnforcedPolicy;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "sdkpin/effective_config@1";

/// Repo config location, relative to the project root
pub const REPO_CONFIG_PATH: &str = ".sdkpin/config.toml";

/// Highest SDK version accepted as a target
const MAX_TARGET_VERSION: u64 = 1000;

/// Host config location (~/.config/sdkpin/config.toml), if HOME is set
pub fn default_host_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/sdkpin/config.toml"))
}

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Repo,
    Cli,
}

/// A contributing layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration plus provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,

    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build the effective config from the four layers.
    ///
    /// Missing host or repo files are skipped; unreadable or invalid ones
    /// are errors.
    pub fn build(
        host_config_path: Option<&Path>,
        repo_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        let files = [
            (ConfigOrigin::Host, host_config_path),
            (ConfigOrigin::Repo, repo_config_path),
        ];
        for (origin, path) in files {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// CLI overrides as a config layer; unset flags contribute nothing
    pub fn cli_layer(target_version: Option<u32>, lint_fatal: Option<bool>) -> Option<Value> {
        let mut policy = serde_json::Map::new();
        if let Some(version) = target_version {
            policy.insert("target_version".to_string(), Value::from(version));
        }
        if let Some(fatal) = lint_fatal {
            policy.insert("lint_fatal".to_string(), Value::Bool(fatal));
        }
        if policy.is_empty() {
            None
        } else {
            Some(serde_json::json!({ "policy": policy }))
        }
    }

    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let table: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok((Self::toml_to_json(table), digest))
    }

    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => Value::Array(arr.into_iter().map(Self::toml_to_json).collect()),
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        match config.pointer("/policy/target_version") {
            Some(v) => match v.as_u64() {
                Some(version) if (1..=MAX_TARGET_VERSION).contains(&version) => {}
                _ => {
                    return Err(ConfigError::ValidationError(format!(
                        "policy.target_version must be an integer in [1, {}], got {}",
                        MAX_TARGET_VERSION, v
                    )))
                }
            },
            None => {
                return Err(ConfigError::ValidationError(
                    "policy.target_version is required".to_string(),
                ))
            }
        }

        if !config
            .pointer("/policy/lint_fatal")
            .map_or(false, Value::is_boolean)
        {
            return Err(ConfigError::ValidationError(
                "policy.lint_fatal must be a boolean".to_string(),
            ));
        }

        if let Some(v) = config.pointer("/graph/eager_module") {
            if !v.is_null() && v.as_str().map_or(true, str::is_empty) {
                return Err(ConfigError::ValidationError(
                    "graph.eager_module must be a non-empty string".to_string(),
                ));
            }
        }

        if config
            .pointer("/layout/build_dir")
            .and_then(Value::as_str)
            .map_or(true, str::is_empty)
        {
            return Err(ConfigError::ValidationError(
                "layout.build_dir must be a non-empty string".to_string(),
            ));
        }

        Ok(())
    }

    /// The enforced policy this configuration resolves to
    pub fn policy(&self) -> EnforcedPolicy {
        let defaults = EnforcedPolicy::default();
        EnforcedPolicy {
            target_version: self
                .get_u64("policy.target_version")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.target_version),
            lint_fatal: self
                .get_bool("policy.lint_fatal")
                .unwrap_or(defaults.lint_fatal),
        }
    }

    /// Configured eager module; a null in a higher layer disables it
    pub fn eager_module(&self) -> Option<&str> {
        self.get_str("graph.eager_module")
    }

    pub fn build_dir(&self) -> &str {
        self.get_str("layout.build_dir").unwrap_or("../../build")
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
