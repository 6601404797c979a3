//! Enforced policy
//!
//! The single value every capable module ends up with. Built once at the
//! start of a run and passed by value to every apply; never read from
//! global state.

use serde::{Deserialize, Serialize};

use sdkpin_graph::{LintOptions, PlatformSettings};

/// Default target SDK version
pub const DEFAULT_TARGET_VERSION: u32 = 36;

/// Default lint policy: lint findings never fail the build
pub const DEFAULT_LINT_FATAL: bool = false;

/// Enforced platform settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedPolicy {
    /// SDK version every capable module compiles against
    pub target_version: u32,

    /// Whether lint errors abort the build (and lint runs on release builds)
    pub lint_fatal: bool,
}

impl Default for EnforcedPolicy {
    fn default() -> Self {
        Self {
            target_version: DEFAULT_TARGET_VERSION,
            lint_fatal: DEFAULT_LINT_FATAL,
        }
    }
}

impl EnforcedPolicy {
    pub fn new(target_version: u32, lint_fatal: bool) -> Self {
        Self {
            target_version,
            lint_fatal,
        }
    }

    /// Settings a module carries once the policy is applied
    pub fn as_settings(&self) -> PlatformSettings {
        PlatformSettings {
            compile_sdk: self.target_version,
            lint: LintOptions {
                abort_on_error: self.lint_fatal,
                check_release_builds: self.lint_fatal,
            },
        }
    }

    /// Whether `settings` already conform to this policy
    pub fn is_satisfied_by(&self, settings: &PlatformSettings) -> bool {
        *settings == self.as_settings()
    }
}
