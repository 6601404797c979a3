//! Module graph and its evaluation driver
//!
//! The graph is the single owner of every module. Evaluation, hook
//! registration and hook execution all go through `&mut Graph`, so checking
//! a module's state and queueing a hook on it cannot be split by a
//! transition happening in between.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::GraphError;
use crate::module::{Hook, Module};

/// Enumerates the modules of a build graph.
pub trait ModuleRegistry {
    /// Ordered snapshot of module names at call time
    fn list(&self) -> Result<Vec<String>, GraphError>;

    /// Mutable access to a module by name
    fn module_mut(&mut self, name: &str) -> Result<&mut Module, GraphError>;
}

/// Reports evaluation state and defers work until a module is evaluated.
pub trait EvaluationGate {
    /// True iff the module's own configuration step has completed
    fn is_evaluated(&self, name: &str) -> Result<bool, GraphError>;

    /// Run `hook` right after the module is evaluated.
    ///
    /// If the module is already evaluated the hook runs synchronously before
    /// this call returns. Otherwise it is queued and runs exactly once, right
    /// after the module's configuration step, before the evaluating call
    /// returns. A failing hook poisons the graph either way.
    fn on_evaluated(&mut self, name: &str, hook: Hook) -> Result<(), GraphError>;
}

/// Ordered collection of modules plus an optional eager evaluation dependency
#[derive(Debug, Default)]
pub struct Graph {
    modules: Vec<Module>,
    index: HashMap<String, usize>,
    eager: Option<String>,
    poisoned: Option<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; names must be unique
    pub fn add_module(&mut self, module: Module) -> Result<(), GraphError> {
        let name = module.name().to_string();
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateModule(name));
        }
        self.index.insert(name, self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    /// Builder-style variant of [`Graph::add_module`]
    pub fn with_module(mut self, module: Module) -> Result<Self, GraphError> {
        self.add_module(module)?;
        Ok(self)
    }

    /// Declare the module every other module's evaluation depends on.
    ///
    /// Evaluating any other module first evaluates this one.
    pub fn set_eager(&mut self, name: &str) -> Result<(), GraphError> {
        self.position(name)?;
        self.eager = Some(name.to_string());
        Ok(())
    }

    pub fn eager(&self) -> Option<&str> {
        self.eager.as_deref()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate modules in declaration order
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn module(&self, name: &str) -> Result<&Module, GraphError> {
        let idx = self.position(name)?;
        Ok(&self.modules[idx])
    }

    /// Run the module's own configuration step, then its queued hooks.
    ///
    /// Fails with [`GraphError::AlreadyEvaluated`] on a second call for the
    /// same module. A failing configuration step or hook poisons the graph:
    /// later traversals report [`GraphError::Traversal`].
    pub fn evaluate(&mut self, name: &str) -> Result<(), GraphError> {
        self.ensure_traversable()?;

        if let Some(eager) = self.eager.clone() {
            if eager != name && !self.module(&eager)?.is_evaluated() {
                debug!(module = name, dependency = %eager, "evaluating dependency first");
                self.evaluate(&eager)?;
            }
        }

        let idx = self.position(name)?;
        let module = &mut self.modules[idx];
        if module.is_evaluated() {
            return Err(GraphError::AlreadyEvaluated(name.to_string()));
        }

        if let Some(script) = module.take_script() {
            if let Err(source) = script(module) {
                self.poisoned = Some(name.to_string());
                return Err(GraphError::Script {
                    module: name.to_string(),
                    source,
                });
            }
        }
        module.mark_evaluated();

        let hooks = std::mem::take(&mut module.hooks);
        debug!(module = name, hooks = hooks.len(), "module evaluated");
        for hook in hooks {
            if let Err(source) = hook(module) {
                self.poisoned = Some(name.to_string());
                return Err(GraphError::Hook {
                    module: name.to_string(),
                    source,
                });
            }
        }

        Ok(())
    }

    /// Evaluate the eager module if it is still pending.
    ///
    /// Returns its name when this call evaluated it.
    pub fn evaluate_eager(&mut self) -> Result<Option<String>, GraphError> {
        match self.eager.clone() {
            Some(eager) if !self.module(&eager)?.is_evaluated() => {
                self.evaluate(&eager)?;
                Ok(Some(eager))
            }
            _ => Ok(None),
        }
    }

    /// Evaluate every still-pending module in declaration order.
    ///
    /// Returns how many modules this call evaluated.
    pub fn evaluate_pending(&mut self) -> Result<usize, GraphError> {
        let mut evaluated = 0;
        for name in self.list()? {
            // An earlier evaluation may have pulled this one in already
            if self.module(&name)?.is_evaluated() {
                continue;
            }
            self.evaluate(&name)?;
            evaluated += 1;
        }
        Ok(evaluated)
    }

    fn position(&self, name: &str) -> Result<usize, GraphError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownModule(name.to_string()))
    }

    fn ensure_traversable(&self) -> Result<(), GraphError> {
        match &self.poisoned {
            Some(module) => Err(GraphError::Traversal(format!(
                "evaluation of module '{}' failed earlier",
                module
            ))),
            None => Ok(()),
        }
    }
}

impl ModuleRegistry for Graph {
    fn list(&self) -> Result<Vec<String>, GraphError> {
        self.ensure_traversable()?;
        Ok(self.modules.iter().map(|m| m.name().to_string()).collect())
    }

    fn module_mut(&mut self, name: &str) -> Result<&mut Module, GraphError> {
        let idx = self.position(name)?;
        Ok(&mut self.modules[idx])
    }
}

impl EvaluationGate for Graph {
    fn is_evaluated(&self, name: &str) -> Result<bool, GraphError> {
        Ok(self.module(name)?.is_evaluated())
    }

    fn on_evaluated(&mut self, name: &str, hook: Hook) -> Result<(), GraphError> {
        self.ensure_traversable()?;

        let module = self.module_mut(name)?;
        if !module.is_evaluated() {
            trace!(module = name, "queueing hook");
            module.hooks.push(hook);
            return Ok(());
        }

        trace!(module = name, "running hook immediately");
        if let Err(source) = hook(module) {
            self.poisoned = Some(name.to_string());
            return Err(GraphError::Hook {
                module: name.to_string(),
                source,
            });
        }
        Ok(())
    }
}
