//! Override orchestration
//!
//! Walks every module of the graph once. Modules already evaluated are
//! probed and overridden on the spot; pending modules get a one-shot hook
//! that does the same work right after their own configuration step. The
//! override therefore always lands after the module's configuration and
//! is never overwritten by it.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use sdkpin_graph::{BoxError, EvaluationGate, Module, ModuleRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::apply::apply;
use crate::error::OverrideError;
use crate::policy::EnforcedPolicy;
use crate::probe::has_capability;

/// What the orchestrator did for one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Module was already evaluated; override applied during the walk
    Applied,
    /// Override applied from the module's after-evaluate hook
    AppliedDeferred,
    /// Module does not carry the capability
    Skipped,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied | Outcome::AppliedDeferred)
    }
}

/// Per-pass record of processed and waiting modules
#[derive(Debug, Default)]
struct Ledger {
    order: Vec<String>,
    outcomes: BTreeMap<String, Outcome>,
    pending: BTreeSet<String>,
}

impl Ledger {
    fn record(&mut self, module: &str, outcome: Outcome) {
        self.pending.remove(module);
        self.order.push(module.to_string());
        self.outcomes.insert(module.to_string(), outcome);
    }
}

/// Propagates one [`EnforcedPolicy`] across a module graph
#[derive(Debug)]
pub struct Orchestrator {
    policy: EnforcedPolicy,
    ledger: Rc<RefCell<Ledger>>,
}

impl Orchestrator {
    pub fn new(policy: EnforcedPolicy) -> Self {
        Self {
            policy,
            ledger: Rc::new(RefCell::new(Ledger::default())),
        }
    }

    pub fn policy(&self) -> &EnforcedPolicy {
        &self.policy
    }

    /// Walk the registry once, applying now or deferring per module.
    ///
    /// Errors from the immediate path are returned here. Errors from a
    /// deferred hook surface from whichever call evaluates that module.
    /// Either way the host stops evaluating modules afterwards.
    pub fn run<H>(&self, host: &mut H) -> Result<(), OverrideError>
    where
        H: ModuleRegistry + EvaluationGate,
    {
        let modules = host.list()?;
        info!(
            modules = modules.len(),
            target_version = self.policy.target_version,
            lint_fatal = self.policy.lint_fatal,
            "enforcing platform policy"
        );

        for name in modules {
            // Evaluated modules run the hook on the spot; the graph still
            // sees any failure and refuses further evaluation.
            let deferred = !host.is_evaluated(&name)?;
            if deferred {
                self.ledger.borrow_mut().pending.insert(name.clone());
                debug!(module = %name, "deferring override until evaluated");
            }

            let policy = self.policy;
            let ledger = Rc::clone(&self.ledger);
            host.on_evaluated(
                &name,
                Box::new(move |module: &mut Module| {
                    process(module, &policy, &ledger, deferred)
                        .map_err(|e| Box::new(e) as BoxError)
                }),
            )?;
        }

        Ok(())
    }

    /// Outcomes in the order they were recorded
    pub fn outcomes(&self) -> Vec<(String, Outcome)> {
        let ledger = self.ledger.borrow();
        ledger
            .order
            .iter()
            .filter_map(|name| ledger.outcomes.get(name).map(|o| (name.clone(), *o)))
            .collect()
    }

    pub fn outcome(&self, module: &str) -> Option<Outcome> {
        self.ledger.borrow().outcomes.get(module).copied()
    }

    /// Modules whose hook has not fired yet
    pub fn pending(&self) -> Vec<String> {
        self.ledger.borrow().pending.iter().cloned().collect()
    }
}

fn process(
    module: &mut Module,
    policy: &EnforcedPolicy,
    ledger: &RefCell<Ledger>,
    deferred: bool,
) -> Result<(), OverrideError> {
    if ledger.borrow().outcomes.contains_key(module.name()) {
        return Err(OverrideError::DoubleEvaluation {
            module: module.name().to_string(),
        });
    }

    let outcome = if has_capability(module) {
        apply(module, policy)?;
        if deferred {
            Outcome::AppliedDeferred
        } else {
            Outcome::Applied
        }
    } else {
        debug!(module = module.name(), kind = %module.kind(), "no platform settings; skipped");
        Outcome::Skipped
    };

    ledger.borrow_mut().record(module.name(), outcome);
    Ok(())
}
