//! Override propagation scenarios
//!
//! Every capable module must end up with the enforced policy, whether it
//! was evaluated before the orchestrator ran or long after.

use std::cell::RefCell;
use std::rc::Rc;

use sdkpin::{
    EnforcedPolicy, EvaluationGate, Graph, GraphError, LintOptions, Module, ModuleKind,
    ModuleRegistry, Orchestrator, OverrideError, Outcome, PlatformSettings,
};

fn expected() -> PlatformSettings {
    PlatformSettings {
        compile_sdk: 36,
        lint: LintOptions {
            abort_on_error: false,
            check_release_builds: false,
        },
    }
}

fn settings(graph: &Graph, name: &str) -> PlatformSettings {
    *graph.module(name).unwrap().settings().unwrap()
}

// === Mixed eager and lazy graph ===

#[test]
fn test_app_unchanged_libraries_enforced() {
    let app_settings = PlatformSettings::new(34);
    let mut graph = Graph::new()
        .with_module(
            Module::new("AppModule", ModuleKind::Application).with_declared_settings(app_settings),
        )
        .unwrap()
        .with_module(
            Module::new("LibA", ModuleKind::Library)
                .with_declared_settings(PlatformSettings::new(30)),
        )
        .unwrap()
        .with_module(
            Module::new("LibB", ModuleKind::Library)
                .with_declared_settings(PlatformSettings::new(33)),
        )
        .unwrap();
    graph.set_eager("AppModule").unwrap();

    // LibB is already evaluated when the orchestrator starts
    graph.evaluate("LibB").unwrap();
    assert!(graph.is_evaluated("AppModule").unwrap());

    let orchestrator = Orchestrator::new(EnforcedPolicy::new(36, false));
    orchestrator.run(&mut graph).unwrap();
    assert_eq!(orchestrator.pending(), vec!["LibA"]);

    graph.evaluate_pending().unwrap();

    assert_eq!(settings(&graph, "AppModule"), app_settings);
    assert_eq!(settings(&graph, "LibA"), expected());
    assert_eq!(settings(&graph, "LibB"), expected());

    assert_eq!(orchestrator.outcome("AppModule"), Some(Outcome::Skipped));
    assert_eq!(orchestrator.outcome("LibA"), Some(Outcome::AppliedDeferred));
    assert_eq!(orchestrator.outcome("LibB"), Some(Outcome::Applied));
    assert!(orchestrator.pending().is_empty());
}

#[test]
fn test_plain_module_untouched() {
    let mut graph = Graph::new()
        .with_module(Module::new(":tools", ModuleKind::Plain))
        .unwrap();

    let orchestrator = Orchestrator::new(EnforcedPolicy::default());
    orchestrator.run(&mut graph).unwrap();
    graph.evaluate_pending().unwrap();

    assert!(graph.module(":tools").unwrap().settings().is_none());
    assert_eq!(orchestrator.outcome(":tools"), Some(Outcome::Skipped));
}

// === Ordering ===

#[test]
fn test_own_configuration_runs_before_override() {
    let seen_by_script = Rc::new(RefCell::new(None));
    let seen = Rc::clone(&seen_by_script);

    let mut graph = Graph::new()
        .with_module(Module::new("LibA", ModuleKind::Library).with_script(move |module| {
            // The module's own configuration declares an older SDK
            *seen.borrow_mut() = module.settings().map(|s| s.compile_sdk);
            module.install_settings(PlatformSettings::new(21));
            Ok(())
        }))
        .unwrap();

    let orchestrator = Orchestrator::new(EnforcedPolicy::default());
    orchestrator.run(&mut graph).unwrap();

    // Nothing was applied before the module's configuration ran
    assert!(graph.module("LibA").unwrap().settings().is_none());

    graph.evaluate("LibA").unwrap();

    assert_eq!(*seen_by_script.borrow(), None);
    assert_eq!(settings(&graph, "LibA").compile_sdk, 36);
}

#[test]
fn test_script_editing_settings_after_registration() {
    let mut graph = Graph::new()
        .with_module(Module::new("LibA", ModuleKind::Library).with_script(|module| {
            module.install_settings(PlatformSettings::new(36));
            if let Some(settings) = module.settings_mut() {
                settings.compile_sdk = 21;
                settings.lint.abort_on_error = true;
            }
            Ok(())
        }))
        .unwrap();

    let orchestrator = Orchestrator::new(EnforcedPolicy::default());
    orchestrator.run(&mut graph).unwrap();
    graph.evaluate("LibA").unwrap();

    assert_eq!(settings(&graph, "LibA"), expected());
}

#[test]
fn test_other_hooks_observe_override() {
    let mut graph = Graph::new()
        .with_module(
            Module::new(":lib", ModuleKind::Library)
                .with_declared_settings(PlatformSettings::new(28)),
        )
        .unwrap();

    let orchestrator = Orchestrator::new(EnforcedPolicy::default());
    orchestrator.run(&mut graph).unwrap();

    // A downstream consumer registered after the orchestrator sees the policy
    let observed = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&observed);
    graph
        .on_evaluated(
            ":lib",
            Box::new(move |module: &mut Module| {
                *sink.borrow_mut() = module.settings().copied();
                Ok(())
            }),
        )
        .unwrap();

    graph.evaluate(":lib").unwrap();
    assert_eq!(*observed.borrow(), Some(expected()));
}

#[test]
fn test_any_evaluation_order() {
    let names = [":a", ":b", ":c", ":d"];
    let orders: [[usize; 4]; 3] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1]];

    for order in orders {
        let mut graph = Graph::new();
        for (i, name) in names.iter().enumerate() {
            graph
                .add_module(
                    Module::new(*name, ModuleKind::Library)
                        .with_declared_settings(PlatformSettings::new(20 + i as u32)),
                )
                .unwrap();
        }

        // First module in this order is evaluated before orchestration
        graph.evaluate(names[order[0]]).unwrap();
        let orchestrator = Orchestrator::new(EnforcedPolicy::default());
        orchestrator.run(&mut graph).unwrap();
        for &i in &order[1..] {
            graph.evaluate(names[i]).unwrap();
        }

        for name in names {
            assert_eq!(settings(&graph, name), expected(), "order {:?}", order);
        }
        assert!(orchestrator.pending().is_empty());
    }
}

// === Idempotence and exactly-once ===

#[test]
fn test_duplicate_apply_is_idempotent() {
    let mut graph = Graph::new()
        .with_module(
            Module::new(":lib", ModuleKind::Library)
                .with_declared_settings(PlatformSettings::new(21)),
        )
        .unwrap();
    graph.evaluate(":lib").unwrap();

    let policy = EnforcedPolicy::default();
    let module = graph.module_mut(":lib").unwrap();
    sdkpin::apply::apply(module, &policy).unwrap();
    let once = *module.settings().unwrap();
    sdkpin::apply::apply(module, &policy).unwrap();

    assert_eq!(*module.settings().unwrap(), once);
    assert_eq!(once, expected());
}

#[test]
fn test_duplicate_hook_fire_is_surfaced() {
    let mut graph = Graph::new()
        .with_module(
            Module::new(":lib", ModuleKind::Library)
                .with_declared_settings(PlatformSettings::new(21)),
        )
        .unwrap();

    let orchestrator = Orchestrator::new(EnforcedPolicy::default());
    orchestrator.run(&mut graph).unwrap();
    // Wiring the same orchestrator twice queues a second hook
    orchestrator.run(&mut graph).unwrap();

    let err = OverrideError::from(graph.evaluate(":lib").unwrap_err());
    assert!(matches!(err, OverrideError::DoubleEvaluation { ref module } if module == ":lib"));
}

#[test]
fn test_module_evaluated_twice_rejected() {
    let mut graph = Graph::new()
        .with_module(Module::new(":lib", ModuleKind::Library))
        .unwrap();
    graph.evaluate(":lib").unwrap();

    assert!(matches!(
        graph.evaluate(":lib"),
        Err(GraphError::AlreadyEvaluated(_))
    ));
}

// === Failures ===

#[test]
fn test_capable_module_without_surface_halts() {
    let mut graph = Graph::new()
        .with_module(Module::new(":broken", ModuleKind::Library))
        .unwrap()
        .with_module(
            Module::new(":fine", ModuleKind::Library)
                .with_declared_settings(PlatformSettings::new(21)),
        )
        .unwrap();

    let orchestrator = Orchestrator::new(EnforcedPolicy::default());
    orchestrator.run(&mut graph).unwrap();

    let err = OverrideError::from(graph.evaluate_pending().unwrap_err());
    assert!(matches!(err, OverrideError::CapabilityMismatch { ref module } if module == ":broken"));
    assert_eq!(err.module(), Some(":broken"));

    // The pass stops; later modules are neither evaluated nor silently skipped
    assert!(!graph.module(":fine").unwrap().is_evaluated());
    assert_eq!(orchestrator.outcome(":fine"), None);
    assert!(matches!(graph.list(), Err(GraphError::Traversal(_))));
}

#[test]
fn test_immediate_path_failure_stops_walk() {
    let mut graph = Graph::new()
        .with_module(Module::new(":broken", ModuleKind::Library))
        .unwrap()
        .with_module(
            Module::new(":later", ModuleKind::Library)
                .with_declared_settings(PlatformSettings::new(21)),
        )
        .unwrap();
    graph.evaluate(":broken").unwrap();

    let orchestrator = Orchestrator::new(EnforcedPolicy::default());
    let err = orchestrator.run(&mut graph).unwrap_err();

    assert!(matches!(err, OverrideError::CapabilityMismatch { .. }));
    assert_eq!(graph.module(":later").unwrap().pending_hooks(), 0);

    // The unreached module can no longer be configured without the override
    assert!(matches!(graph.list(), Err(GraphError::Traversal(_))));
    assert!(matches!(
        graph.evaluate(":later"),
        Err(GraphError::Traversal(_))
    ));
    assert!(!graph.module(":later").unwrap().is_evaluated());
    assert!(graph.module(":later").unwrap().settings().is_none());
}

#[test]
fn test_failed_configuration_names_module() {
    let mut graph = Graph::new()
        .with_module(
            Module::new(":printing", ModuleKind::Library)
                .with_script(|_| Err("android:attr/lStar not found".into())),
        )
        .unwrap();

    let orchestrator = Orchestrator::new(EnforcedPolicy::default());
    orchestrator.run(&mut graph).unwrap();

    let err = OverrideError::from(graph.evaluate(":printing").unwrap_err());
    assert_eq!(err.module(), Some(":printing"));
    assert!(err.to_string().contains("lStar"));
    assert_eq!(orchestrator.pending(), vec![":printing"]);
}
