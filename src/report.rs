//! Override report artifact (override_report.json)

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use sdkpin_graph::{Graph, ModuleKind, PlatformSettings};
use serde::{Deserialize, Serialize};

use crate::layout::BuildLayout;
use crate::orchestrator::{Orchestrator, Outcome};
use crate::policy::EnforcedPolicy;

/// Schema version for override_report.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "sdkpin/override_report@1";

/// Final state of one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReport {
    pub name: String,

    pub kind: ModuleKind,

    /// What the orchestrator did; absent if its hook never fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,

    /// Settings after the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<PlatformSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<String>,
}

/// Result of one enforcement run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideReport {
    pub schema_version: u32,

    pub schema_id: String,

    /// Unique id of this run
    pub run_id: String,

    pub created_at: DateTime<Utc>,

    /// Policy enforced during the run
    pub policy: EnforcedPolicy,

    /// Module evaluated ahead of the others
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eager_module: Option<String>,

    pub root_build_dir: String,

    /// Modules in graph order
    pub modules: Vec<ModuleReport>,
}

impl OverrideReport {
    /// Snapshot the graph after a run
    pub fn new(graph: &Graph, orchestrator: &Orchestrator, layout: &BuildLayout) -> Self {
        let modules = graph
            .modules()
            .map(|module| ModuleReport {
                name: module.name().to_string(),
                kind: module.kind(),
                outcome: orchestrator.outcome(module.name()),
                settings: module.settings().copied(),
                build_dir: module
                    .build_dir()
                    .map(|dir| dir.to_string_lossy().to_string()),
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            policy: *orchestrator.policy(),
            eager_module: graph.eager().map(str::to_string),
            root_build_dir: layout.root_build_dir().to_string_lossy().to_string(),
            modules,
        }
    }

    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn applied_count(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| m.outcome.map_or(false, |o| o.is_applied()))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| m.outcome == Some(Outcome::Skipped))
            .count()
    }

    /// Human-readable summary
    pub fn to_human(&self) -> String {
        let mut out = format!(
            "Enforced compile SDK {} (lint fatal: {}) on {} of {} module(s)\n",
            self.policy.target_version,
            self.policy.lint_fatal,
            self.applied_count(),
            self.modules.len()
        );
        for module in &self.modules {
            let outcome = match module.outcome {
                Some(Outcome::Applied) => "applied",
                Some(Outcome::AppliedDeferred) => "applied (after evaluation)",
                Some(Outcome::Skipped) => "skipped",
                None => "not processed",
            };
            let sdk = module
                .settings
                .map(|s| s.compile_sdk.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "  {:<24} {:<12} sdk {:<4} {}\n",
                module.name,
                module.kind.as_str(),
                sdk,
                outcome
            ));
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
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
}
