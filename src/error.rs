//! Override errors
//!
//! Every variant is fatal: the run stops at the first one, naming the
//! offending module.

use sdkpin_graph::GraphError;

/// Errors raised while propagating the enforced policy
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("Module '{module}' is declared capable but exposes no platform settings")]
    CapabilityMismatch { module: String },

    #[error("Module '{module}' has not been evaluated yet; refusing to override")]
    NotEvaluated { module: String },

    #[error("Override hook fired twice for module '{module}'")]
    DoubleEvaluation { module: String },

    #[error(transparent)]
    Graph(GraphError),
}

impl OverrideError {
    /// Name of the module the error refers to, if any
    pub fn module(&self) -> Option<&str> {
        match self {
            OverrideError::CapabilityMismatch { module }
            | OverrideError::NotEvaluated { module }
            | OverrideError::DoubleEvaluation { module } => Some(module),
            OverrideError::Graph(e) => e.module(),
        }
    }
}

impl From<GraphError> for OverrideError {
    /// Unwrap override errors that travelled through a deferred hook
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Hook { module, source } => match source.downcast::<OverrideError>() {
                Ok(inner) => *inner,
                Err(source) => OverrideError::Graph(GraphError::Hook { module, source }),
            },
            other => OverrideError::Graph(other),
        }
    }
}
