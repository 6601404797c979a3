//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::policy::{DEFAULT_LINT_FATAL, DEFAULT_TARGET_VERSION};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Enforced SDK version (default: 36)
    pub target_version: u32,

    /// Whether lint errors fail the build (default: false)
    pub lint_fatal: bool,

    /// Module evaluated before every other one (default: ":app")
    pub eager_module: String,

    /// Root build directory, relative to the project's default build
    /// directory (default: "../../build")
    pub build_dir: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            target_version: DEFAULT_TARGET_VERSION,
            lint_fatal: DEFAULT_LINT_FATAL,
            eager_module: ":app".to_string(),
            build_dir: "../../build".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "policy": {
                "target_version": self.target_version,
                "lint_fatal": self.lint_fatal
            },
            "graph": {
                "eager_module": self.eager_module
            },
            "layout": {
                "build_dir": self.build_dir
            }
        })
    }
}
