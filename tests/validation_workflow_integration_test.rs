//! End-to-end runs of the validation engine over temporary directory trees.

mod common;

use std::sync::{Arc, Mutex};

use serde_json::json;
use validate_json::{
    FileDiscovery, ValidationConfig, ValidationEngine, ValidationError, ValidationPhase,
    ValidationProgress, ValidationStatus,
};

use crate::common::{Workspace, product_schema};

fn engine(threads: usize, fail_fast: bool) -> ValidationEngine {
    ValidationEngine::new(ValidationConfig {
        max_concurrent_validations: threads,
        fail_fast,
    })
    .unwrap()
}

fn catalogue() -> Workspace {
    let workspace = Workspace::new(&product_schema());
    workspace.write("valid/apple.json", r#"{"id": 1, "name": "apple", "price": 0.5}"#);
    workspace.write(
        "valid/pear.json",
        r#"{"id": 2, "name": "pear", "price": 1, "tags": ["fruit", "green"]}"#,
    );
    workspace.write("invalid/free.json", r#"{"id": 3, "name": "free", "price": 0}"#);
    workspace.write(
        "invalid/dupe-tags.json",
        r#"{"id": 4, "name": "plum", "price": 2, "tags": ["a", "a"]}"#,
    );
    workspace.write("broken/truncated.json", r#"{"id": 5, "name": "#);
    workspace.write("notes/readme.txt", "not json at all");
    workspace
}

#[test]
fn test_directory_run_counts_each_outcome() {
    let workspace = catalogue();
    let results = engine(2, false)
        .validate_paths(
            &workspace.schema_path(),
            &[workspace.data_dir()],
            &FileDiscovery::new(),
        )
        .unwrap();

    assert_eq!(results.total_files, 5);
    assert_eq!(results.valid_files, 2);
    assert_eq!(results.invalid_files, 2);
    assert_eq!(results.error_files, 1);
    assert!(results.has_errors());
    assert!(!results.all_valid());
    assert_eq!(results.performance_metrics.concurrent_validations, 2);
    assert!(results.performance_metrics.schema_nodes >= 5);

    let truncated = results
        .file_results
        .iter()
        .find(|r| r.path.ends_with("truncated.json"))
        .unwrap();
    match &truncated.status {
        ValidationStatus::Error { message } => assert!(message.contains("truncated.json")),
        other => panic!("Expected an error status, got {other:?}"),
    }
}

#[test]
fn test_results_follow_discovery_order() {
    let workspace = catalogue();
    let results = engine(4, false)
        .validate_paths(
            &workspace.schema_path(),
            &[workspace.data_dir().join("valid")],
            &FileDiscovery::new(),
        )
        .unwrap();

    let names: Vec<_> = results
        .file_results
        .iter()
        .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["apple.json", "pear.json"]);
    assert!(results.all_valid());
}

#[test]
fn test_explicit_files_and_directories_mix() {
    let workspace = catalogue();
    let single = workspace.data_dir().join("invalid").join("free.json");
    let results = engine(1, false)
        .validate_paths(
            &workspace.schema_path(),
            &[workspace.data_dir().join("valid"), single.clone(), single],
            &FileDiscovery::new(),
        )
        .unwrap();

    // the repeated path is validated once
    assert_eq!(results.total_files, 3);
    assert_eq!(results.invalid_files, 1);
}

#[test]
fn test_extension_and_pattern_filters() {
    let workspace = catalogue();
    workspace.write("valid/extra.geojson", r#"{"id": 9, "name": "geo", "price": 3}"#);

    let discovery = FileDiscovery::new()
        .with_extensions(vec!["json".to_string(), "geojson".to_string()])
        .with_exclude_patterns(vec!["**/broken/**".to_string()])
        .unwrap();
    let results = engine(2, false)
        .validate_paths(&workspace.schema_path(), &[workspace.data_dir()], &discovery)
        .unwrap();

    assert_eq!(results.total_files, 5);
    assert_eq!(results.error_files, 0);
    assert_eq!(results.valid_files, 3);
}

#[test]
fn test_fail_fast_skips_remaining_files() {
    let workspace = Workspace::new(&json!({ "type": "integer" }));
    for n in 0..20 {
        workspace.write(&format!("{n:02}.json"), "\"not a number\"");
    }

    let results = engine(1, true)
        .validate_paths(&workspace.schema_path(), &[workspace.data_dir()], &FileDiscovery::new())
        .unwrap();

    assert_eq!(results.total_files, 20);
    assert!(results.invalid_files >= 1);
    assert!(results.skipped_files >= 1);
    assert_eq!(results.invalid_files + results.skipped_files, 20);
}

#[test]
fn test_broken_schema_aborts_the_run() {
    let workspace = Workspace::new(&json!({ "minLength": -1 }));
    workspace.write("a.json", "\"x\"");

    let error = engine(1, false)
        .validate_paths(&workspace.schema_path(), &[workspace.data_dir()], &FileDiscovery::new())
        .unwrap_err();
    match error {
        ValidationError::SchemaLoading { path, details } => {
            assert!(path.ends_with("schema.json"));
            assert!(details.contains("minLength"));
        }
        other => panic!("Expected SchemaLoading error, got {other:?}"),
    }
}

#[test]
fn test_empty_tree_is_not_an_error() {
    let workspace = Workspace::new(&json!({}));
    let results = engine(1, false)
        .validate_paths(&workspace.schema_path(), &[workspace.data_dir()], &FileDiscovery::new())
        .unwrap();
    assert_eq!(results.total_files, 0);
    assert!(!results.has_errors());
}

#[test]
fn test_progress_reports_every_phase() {
    let workspace = catalogue();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    engine(2, false)
        .validate_paths_with_progress(
            &workspace.schema_path(),
            &[workspace.data_dir()],
            &FileDiscovery::new(),
            Some(Arc::new(move |progress: ValidationProgress| {
                sink.lock().unwrap().push((progress.phase, progress.completed));
            })),
        )
        .unwrap();

    let seen = seen.lock().unwrap();
    let phases: Vec<_> = seen.iter().map(|(phase, _)| *phase).collect();
    assert_eq!(phases.first(), Some(&ValidationPhase::SchemaLoading));
    assert_eq!(phases.last(), Some(&ValidationPhase::Complete));
    let per_file = phases
        .iter()
        .filter(|&&phase| phase == ValidationPhase::Validation)
        .count();
    assert_eq!(per_file, 5);
    assert_eq!(seen.last().map(|(_, completed)| *completed), Some(5));
}

#[test]
fn test_schema_is_compiled_once_per_engine() {
    let workspace = catalogue();
    let validator = engine(2, false);
    for _ in 0..3 {
        validator
            .validate_paths(
                &workspace.schema_path(),
                &[workspace.data_dir().join("valid")],
                &FileDiscovery::new(),
            )
            .unwrap();
    }
    assert_eq!(validator.schema_loader().compiled_count(), 1);
}
