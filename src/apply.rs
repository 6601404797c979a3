//! Override applier

use sdkpin_graph::Module;
use tracing::debug;

use crate::error::OverrideError;
use crate::policy::EnforcedPolicy;

/// Overwrite the module's platform settings with the enforced policy.
///
/// The caller has already probed the module. Whatever the module's own
/// configuration set is replaced; applying twice leaves the same state.
pub fn apply(module: &mut Module, policy: &EnforcedPolicy) -> Result<(), OverrideError> {
    if !module.is_evaluated() {
        return Err(OverrideError::NotEvaluated {
            module: module.name().to_string(),
        });
    }

    let name = module.name().to_string();
    let settings = module
        .settings_mut()
        .ok_or_else(|| OverrideError::CapabilityMismatch {
            module: name.clone(),
        })?;

    let previous = settings.compile_sdk;
    *settings = policy.as_settings();

    debug!(
        module = %name,
        from = previous,
        to = policy.target_version,
        lint_fatal = policy.lint_fatal,
        "override applied"
    );
    Ok(())
}
