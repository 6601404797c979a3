//! Graph errors.

/// Boxed error returned by configuration scripts and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while traversing or evaluating the module graph.
///
/// All of these are fatal for the build invocation.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Module graph cannot be traversed: {0}")]
    Traversal(String),

    #[error("Unknown module: '{0}'")]
    UnknownModule(String),

    #[error("Duplicate module name: '{0}'")]
    DuplicateModule(String),

    #[error("Module '{0}' has already been evaluated")]
    AlreadyEvaluated(String),

    #[error("Configuration of module '{module}' failed: {source}")]
    Script {
        module: String,
        #[source]
        source: BoxError,
    },

    #[error("After-evaluate hook for module '{module}' failed: {source}")]
    Hook {
        module: String,
        #[source]
        source: BoxError,
    },
}

impl GraphError {
    /// Name of the module the error refers to, if any
    pub fn module(&self) -> Option<&str> {
        match self {
            GraphError::Traversal(_) => None,
            GraphError::UnknownModule(name)
            | GraphError::DuplicateModule(name)
            | GraphError::AlreadyEvaluated(name) => Some(name),
            GraphError::Script { module, .. } | GraphError::Hook { module, .. } => Some(module),
        }
    }
}
