//! End-to-end runs from manifest and config files on disk

use std::fs;
use std::path::Path;

use sdkpin::config::REPO_CONFIG_PATH;
use sdkpin::{
    BuildSession, EffectiveConfig, EnforcedPolicy, GraphManifest, ManifestError, ModuleKind,
    Outcome, OverrideError, OverrideReport, SessionError,
};
use tempfile::TempDir;

const FLUTTER_GRAPH: &str = r#"
root = "android"

[[module]]
name = ":printing"
kind = "library"
compile_sdk = 30

[[module]]
name = ":app"
kind = "application"
compile_sdk = 35
abort_on_error = true

[[module]]
name = ":pdfx"
kind = "library"
compile_sdk = 33
check_release_builds = true

[[module]]
name = ":codegen"
kind = "plain"
"#;

fn write_project(dir: &Path, repo_config: Option<&str>) -> GraphManifest {
    fs::write(dir.join("sdkpin.toml"), FLUTTER_GRAPH).unwrap();
    if let Some(config) = repo_config {
        let path = dir.join(REPO_CONFIG_PATH);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, config).unwrap();
    }
    GraphManifest::load(&dir.join("sdkpin.toml")).unwrap()
}

#[test]
fn test_default_policy_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let manifest = write_project(tmp.path(), None);
    let repo = tmp.path().join(REPO_CONFIG_PATH);
    let config = EffectiveConfig::build(None, Some(&repo), None).unwrap();

    let mut session = BuildSession::from_manifest(&manifest, tmp.path(), &config).unwrap();
    let report = session.run().unwrap();

    assert_eq!(report.policy, EnforcedPolicy::new(36, false));
    assert_eq!(report.eager_module.as_deref(), Some(":app"));
    assert_eq!(report.applied_count(), 2);
    assert_eq!(report.skipped_count(), 2);

    for name in [":printing", ":pdfx"] {
        let module = report.module(name).unwrap();
        let settings = module.settings.unwrap();
        assert_eq!(settings.compile_sdk, 36, "{}", name);
        assert!(!settings.lint.abort_on_error);
        assert!(!settings.lint.check_release_builds);
    }

    // The eager module was evaluated before the walk, so nothing was deferred for it
    let app = report.module(":app").unwrap();
    assert_eq!(app.kind, ModuleKind::Application);
    assert_eq!(app.outcome, Some(Outcome::Skipped));
    assert_eq!(app.settings.unwrap().compile_sdk, 35);
    assert!(app.settings.unwrap().lint.abort_on_error);

    let codegen = report.module(":codegen").unwrap();
    assert!(codegen.settings.is_none());
}

#[test]
fn test_build_dirs_relocated_next_to_project() {
    let tmp = TempDir::new().unwrap();
    let manifest = write_project(tmp.path(), None);
    let config = EffectiveConfig::build(None, None, None).unwrap();

    let mut session = BuildSession::from_manifest(&manifest, tmp.path(), &config).unwrap();
    let report = session.run().unwrap();

    // <tmp>/android/build/../../build
    let root = tmp.path().join("build");
    assert_eq!(Path::new(&report.root_build_dir), root);
    assert_eq!(
        report.module(":pdfx").unwrap().build_dir.clone(),
        Some(root.join("pdfx").to_string_lossy().to_string())
    );
}

#[test]
fn test_repo_config_and_cli_layers() {
    let tmp = TempDir::new().unwrap();
    let manifest = write_project(
        tmp.path(),
        Some("[policy]\ntarget_version = 35\nlint_fatal = true\n\n[layout]\nbuild_dir = \"out\"\n"),
    );
    let repo = tmp.path().join(REPO_CONFIG_PATH);

    let config = EffectiveConfig::build(None, Some(&repo), None).unwrap();
    let mut session = BuildSession::from_manifest(&manifest, tmp.path(), &config).unwrap();
    let report = session.run().unwrap();

    let printing = report.module(":printing").unwrap().settings.unwrap();
    assert_eq!(printing.compile_sdk, 35);
    assert!(printing.lint.abort_on_error);
    assert!(printing.lint.check_release_builds);
    assert_eq!(
        Path::new(&report.root_build_dir),
        tmp.path().join("android").join("build").join("out")
    );

    let cli = EffectiveConfig::cli_layer(Some(34), None);
    let config = EffectiveConfig::build(None, Some(&repo), cli).unwrap();
    assert_eq!(config.policy(), EnforcedPolicy::new(34, true));
}

#[test]
fn test_report_written_and_reloaded() {
    let tmp = TempDir::new().unwrap();
    let manifest = write_project(tmp.path(), None);
    let config = EffectiveConfig::build(None, None, None).unwrap();

    let mut session = BuildSession::from_manifest(&manifest, tmp.path(), &config).unwrap();
    let report = session.run().unwrap();

    let path = tmp.path().join("override_report.json");
    report.write_to_file(&path).unwrap();

    let loaded = OverrideReport::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.modules, report.modules);
}

#[test]
fn test_manifest_eager_must_exist() {
    let content = format!("eager = \":host\"\n{}", FLUTTER_GRAPH);
    let err = GraphManifest::parse(&content).unwrap_err();
    assert!(matches!(err, ManifestError::UnknownEager(name) if name == ":host"));
}

#[test]
fn test_manifest_eager_overrides_config() {
    let content = format!("eager = \":printing\"\n{}", FLUTTER_GRAPH);
    let manifest = GraphManifest::parse(&content).unwrap();
    let config = EffectiveConfig::build(None, None, None).unwrap();

    let session = BuildSession::from_manifest(&manifest, Path::new("/repo"), &config).unwrap();
    assert_eq!(session.graph().eager(), Some(":printing"));
}

#[test]
fn test_mismatched_library_fails_whole_run() {
    let content = format!(
        "{}\n[[module]]\nname = \":legacy\"\nkind = \"library\"\n",
        FLUTTER_GRAPH
    );
    let manifest = GraphManifest::parse(&content).unwrap();
    let config = EffectiveConfig::build(None, None, None).unwrap();

    let mut session =
        BuildSession::from_manifest(&manifest, Path::new("/repo"), &config).unwrap();
    let err = session.run().unwrap_err();

    assert!(matches!(
        err,
        SessionError::Override(OverrideError::CapabilityMismatch { ref module }) if module == ":legacy"
    ));
    assert!(err.to_string().contains(":legacy"));
}

#[test]
fn test_clean_after_run() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");
    fs::create_dir_all(&project).unwrap();
    let manifest = write_project(&project, None);
    let config = EffectiveConfig::build(None, None, None).unwrap();

    let session = BuildSession::from_manifest(&manifest, &project, &config).unwrap();
    let module_dir = session.layout().module_dir(":printing");
    fs::create_dir_all(&module_dir).unwrap();
    fs::write(module_dir.join("classes.jar"), b"jar").unwrap();

    assert_eq!(session.layout().root_build_dir(), project.join("build"));
    assert!(session.layout().clean().unwrap());
    assert!(!project.join("build").exists());
    assert!(project.join("sdkpin.toml").exists());
}
