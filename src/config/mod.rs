//! Layered configuration
//!
//! Merges, lowest precedence first:
//! 1. Built-in defaults
//! 2. Host config (~/.config/sdkpin/config.toml)
//! 3. Repo config (.sdkpin/config.toml)
//! 4. CLI flags
//!
//! The enforced policy is read from the merged result exactly once.

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{
    default_host_config_path, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig,
    REPO_CONFIG_PATH,
};
pub use merge::{deep_merge, merge_layers};
