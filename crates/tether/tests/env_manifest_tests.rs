//! Environment manifest integration tests

use std::fs;

use tether::env::{EnvError, EnvManifest, MANIFEST_PATH};
use tether_runtime::{InitError, Interpreter, InterpreterConfig};

fn write_manifest(root: &std::path::Path, text: &str) {
    let path = root.join(MANIFEST_PATH);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

#[test]
fn test_read_manifest_from_project_root() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(
        dir.path(),
        "# written by the provisioner\nTETHER_IT_HOME=/opt/runtime\nTETHER_IT_PATH=/opt/runtime/lib\n",
    );

    let manifest = EnvManifest::read(dir.path()).unwrap();
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.get("TETHER_IT_HOME"), Some("/opt/runtime"));
    let keys: Vec<&str> = manifest.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ["TETHER_IT_HOME", "TETHER_IT_PATH"]);
}

#[test]
fn test_missing_manifest_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    match EnvManifest::read(dir.path()) {
        Err(EnvError::Io { path, .. }) => assert!(path.ends_with("env.txt")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_applied_manifest_satisfies_required_env() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "TETHER_IT_REQUIRED=1\n");

    let config = InterpreterConfig {
        required_env: vec!["TETHER_IT_REQUIRED".to_string()],
        ..Default::default()
    };
    assert_eq!(
        Interpreter::initialize(config.clone()).err(),
        Some(InitError::MissingEnv("TETHER_IT_REQUIRED".to_string()))
    );

    EnvManifest::read(dir.path()).unwrap().apply();
    let interp = Interpreter::initialize(config).unwrap();
    interp.finalize();
}
