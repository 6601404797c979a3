//! Capability probe

use sdkpin_graph::Module;

/// Whether the module carries the overridable platform settings.
///
/// Pure inspection of the kind tag; modules without the capability are
/// skipped by the orchestrator.
pub fn has_capability(module: &Module) -> bool {
    module.kind().exposes_platform_settings()
}
