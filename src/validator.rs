//! Parallel Validation Engine
//!
//! Validates many JSON files against one compiled schema:
//! - **Schema loading**: the schema is compiled once and shared by every worker
//! - **Streaming**: each file is fed through a validation session straight from
//!   a buffered reader, without building a document tree
//! - **Parallelism**: a bounded `rayon` thread pool validates files concurrently
//! - **Fail-fast**: optionally skip the remaining files after the first failure

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, ValidationError};
use crate::file_discovery::FileDiscovery;
use crate::graph::Schema;
use crate::schema_loader::SchemaLoader;

/// Validation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    /// Number of concurrent validation threads
    pub max_concurrent_validations: usize,
    /// Skip remaining files after the first one that does not validate
    pub fail_fast: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_validations: num_cpus::get(),
            fail_fast: false,
        }
    }
}

/// Status of a single file validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationStatus {
    /// File conforms to the schema
    Valid,
    /// File is well-formed JSON that does not conform to the schema
    Invalid,
    /// File could not be read or is not well-formed JSON
    Error { message: String },
    /// File was not validated (fail-fast after an earlier failure)
    Skipped { reason: String },
}

impl ValidationStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationStatus::Invalid)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationStatus::Error { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ValidationStatus::Skipped { .. })
    }
}

/// Result of validating a single file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileValidationResult {
    /// Path to the validated file
    pub path: PathBuf,
    /// Validation status
    #[serde(flatten)]
    pub status: ValidationStatus,
    /// Duration of validation
    pub duration: Duration,
}

impl FileValidationResult {
    pub fn valid(path: PathBuf, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Valid,
            duration,
        }
    }

    pub fn invalid(path: PathBuf, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Invalid,
            duration,
        }
    }

    pub fn error(path: PathBuf, error: ValidationError, duration: Duration) -> Self {
        Self {
            path,
            status: ValidationStatus::Error {
                message: error.to_string(),
            },
            duration,
        }
    }

    pub fn skipped(path: PathBuf, reason: String) -> Self {
        Self {
            path,
            status: ValidationStatus::Skipped { reason },
            duration: Duration::ZERO,
        }
    }
}

/// Progress update for validation
#[derive(Debug, Clone)]
pub struct ValidationProgress {
    /// File just finished, if any
    pub current_file: Option<PathBuf>,
    /// Number of files completed
    pub completed: usize,
    /// Total number of files to process
    pub total: usize,
    /// Current phase of validation
    pub phase: ValidationPhase,
}

/// Phase of validation process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPhase {
    SchemaLoading,
    Discovery,
    Validation,
    Aggregation,
    Complete,
}

/// Performance metrics for validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Total wall-clock duration
    pub total_duration: Duration,
    /// Schema compilation duration
    pub schema_loading_duration: Duration,
    /// File discovery duration
    pub discovery_duration: Duration,
    /// Validation duration (wall clock)
    pub validation_duration: Duration,
    /// Average time per file
    pub average_time_per_file: Duration,
    /// Files processed per second
    pub throughput_files_per_second: f64,
    /// Number of worker threads
    pub concurrent_validations: usize,
    /// Number of nodes in the compiled schema graph
    pub schema_nodes: usize,
}

/// Aggregated results of validating multiple files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResults {
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    pub error_files: usize,
    pub skipped_files: usize,
    /// Sum of the per-file durations
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub file_results: Vec<FileValidationResult>,
    pub performance_metrics: PerformanceMetrics,
}

impl ValidationResults {
    /// Aggregate individual file results into summary
    pub fn aggregate(file_results: Vec<FileValidationResult>) -> Self {
        let total_files = file_results.len();
        let mut valid_files = 0;
        let mut invalid_files = 0;
        let mut error_files = 0;
        let mut skipped_files = 0;
        let mut total_duration = Duration::ZERO;

        for result in &file_results {
            match result.status {
                ValidationStatus::Valid => valid_files += 1,
                ValidationStatus::Invalid => invalid_files += 1,
                ValidationStatus::Error { .. } => error_files += 1,
                ValidationStatus::Skipped { .. } => skipped_files += 1,
            }
            total_duration += result.duration;
        }

        let average_duration = if total_files > 0 {
            total_duration / total_files as u32
        } else {
            Duration::ZERO
        };

        let performance_metrics = PerformanceMetrics {
            total_duration,
            validation_duration: total_duration,
            average_time_per_file: average_duration,
            throughput_files_per_second: if total_duration.as_secs_f64() > 0.0 {
                total_files as f64 / total_duration.as_secs_f64()
            } else {
                0.0
            },
            concurrent_validations: 1,
            ..PerformanceMetrics::default()
        };

        Self {
            total_files,
            valid_files,
            invalid_files,
            error_files,
            skipped_files,
            total_duration,
            average_duration,
            file_results,
            performance_metrics,
        }
    }

    /// Create results with detailed performance metrics
    pub fn with_metrics(
        file_results: Vec<FileValidationResult>,
        performance_metrics: PerformanceMetrics,
    ) -> Self {
        let mut results = Self::aggregate(file_results);
        results.performance_metrics = performance_metrics;
        results
    }

    /// Check if all files validated successfully
    pub fn all_valid(&self) -> bool {
        self.valid_files == self.total_files && self.total_files > 0
    }

    /// Check if any file did not validate
    pub fn has_errors(&self) -> bool {
        self.error_files > 0 || self.invalid_files > 0
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.valid_files as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Progress callback type for validation updates
pub type ProgressCallback = Arc<dyn Fn(ValidationProgress) + Send + Sync>;

/// Validates files in parallel against schemas compiled by its [`SchemaLoader`].
pub struct ValidationEngine {
    schema_loader: Arc<SchemaLoader>,
    pool: rayon::ThreadPool,
    config: ValidationConfig,
}

impl ValidationEngine {
    /// Create a new validation engine with its own worker pool
    pub fn new(config: ValidationConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_concurrent_validations)
            .thread_name(|index| format!("validate-json-{}", index))
            .build()
            .map_err(|e| ValidationError::Concurrency {
                details: format!("Failed to build worker pool: {}", e),
            })?;

        Ok(Self {
            schema_loader: Arc::new(SchemaLoader::new()),
            pool,
            config,
        })
    }

    /// Validate every file discovered under `paths` against the schema at `schema_path`
    pub fn validate_paths(
        &self,
        schema_path: &Path,
        paths: &[PathBuf],
        file_discovery: &FileDiscovery,
    ) -> Result<ValidationResults> {
        self.validate_paths_with_progress(schema_path, paths, file_discovery, None)
    }

    /// Like [`ValidationEngine::validate_paths`], reporting progress per phase and file
    pub fn validate_paths_with_progress(
        &self,
        schema_path: &Path,
        paths: &[PathBuf],
        file_discovery: &FileDiscovery,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ValidationResults> {
        let workflow_start = Instant::now();
        let report = |phase, completed, total| {
            if let Some(callback) = &progress_callback {
                callback(ValidationProgress {
                    current_file: None,
                    completed,
                    total,
                    phase,
                });
            }
        };
        let mut metrics = PerformanceMetrics {
            concurrent_validations: self.config.max_concurrent_validations,
            ..PerformanceMetrics::default()
        };

        // Phase 1: Schema compilation; a broken schema aborts the run
        report(ValidationPhase::SchemaLoading, 0, 0);
        let loading_start = Instant::now();
        let schema = self.schema_loader.load(schema_path)?;
        metrics.schema_loading_duration = loading_start.elapsed();
        metrics.schema_nodes = schema.graph().len();

        // Phase 2: File discovery
        report(ValidationPhase::Discovery, 0, 0);
        let discovery_start = Instant::now();
        let files = file_discovery.discover_all(paths)?;
        metrics.discovery_duration = discovery_start.elapsed();
        if files.is_empty() {
            warn!("no files matched the configured extensions and patterns");
        }

        // Phase 3: Validation
        let validation_start = Instant::now();
        let results = self.validate_files_with_progress(&schema, files, progress_callback.clone());
        metrics.validation_duration = validation_start.elapsed();

        // Phase 4: Aggregation
        report(ValidationPhase::Aggregation, results.len(), results.len());
        metrics.total_duration = workflow_start.elapsed();
        if !results.is_empty() {
            metrics.average_time_per_file = metrics.validation_duration / results.len() as u32;
        }
        if metrics.total_duration.as_secs_f64() > 0.0 {
            metrics.throughput_files_per_second =
                results.len() as f64 / metrics.total_duration.as_secs_f64();
        }

        let final_results = ValidationResults::with_metrics(results, metrics);
        info!(
            total = final_results.total_files,
            valid = final_results.valid_files,
            invalid = final_results.invalid_files,
            errors = final_results.error_files,
            skipped = final_results.skipped_files,
            "validation finished"
        );
        report(
            ValidationPhase::Complete,
            final_results.total_files,
            final_results.total_files,
        );
        Ok(final_results)
    }

    /// Validate a list of files against `schema`, preserving input order
    pub fn validate_files(&self, schema: &Schema, files: Vec<PathBuf>) -> Vec<FileValidationResult> {
        self.validate_files_with_progress(schema, files, None)
    }

    /// Validate a list of files with progress tracking
    pub fn validate_files_with_progress(
        &self,
        schema: &Schema,
        files: Vec<PathBuf>,
        progress_callback: Option<ProgressCallback>,
    ) -> Vec<FileValidationResult> {
        let total_files = files.len();
        let completed = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let fail_fast = self.config.fail_fast;

        self.pool.install(|| {
            files
                .into_par_iter()
                .map(|file_path| {
                    if stop.load(Ordering::Relaxed) {
                        return FileValidationResult::skipped(
                            file_path,
                            "skipped after an earlier failure (fail-fast)".to_string(),
                        );
                    }

                    let result = Self::validate_single_file(schema, &file_path);
                    if fail_fast && !result.status.is_valid() {
                        stop.store(true, Ordering::Relaxed);
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(callback) = &progress_callback {
                        callback(ValidationProgress {
                            current_file: Some(file_path),
                            completed: done,
                            total: total_files,
                            phase: ValidationPhase::Validation,
                        });
                    }
                    result
                })
                .collect()
        })
    }

    /// Stream one file through a fresh session
    pub fn validate_single_file(schema: &Schema, file_path: &Path) -> FileValidationResult {
        let start_time = Instant::now();
        let path = file_path.to_path_buf();

        let file = match File::open(file_path) {
            Ok(file) => file,
            Err(e) => return FileValidationResult::error(path, e.into(), start_time.elapsed()),
        };

        match schema.validate_reader(BufReader::new(file)) {
            Ok(true) => {
                debug!(path = %file_path.display(), "valid");
                FileValidationResult::valid(path, start_time.elapsed())
            }
            Ok(false) => {
                info!(path = %file_path.display(), "does not conform to schema");
                FileValidationResult::invalid(path, start_time.elapsed())
            }
            Err(ValidationError::Json(e)) => {
                warn!(path = %file_path.display(), error = %e, "malformed JSON");
                let error = ValidationError::InstanceParsing {
                    file: path.clone(),
                    details: e.to_string(),
                };
                FileValidationResult::error(path, error, start_time.elapsed())
            }
            Err(e) => FileValidationResult::error(path, e, start_time.elapsed()),
        }
    }

    pub fn schema_loader(&self) -> &Arc<SchemaLoader> {
        &self.schema_loader
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn create_test_engine(fail_fast: bool) -> ValidationEngine {
        ValidationEngine::new(ValidationConfig {
            max_concurrent_validations: 2,
            fail_fast,
        })
        .unwrap()
    }

    fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn object_schema() -> Schema {
        Schema::new(json!({
            "type": "object",
            "properties": { "id": { "type": "integer" } },
            "required": ["id"]
        }))
        .unwrap()
    }

    #[test]
    fn test_validation_status_predicates() {
        assert!(ValidationStatus::Valid.is_valid());
        assert!(ValidationStatus::Invalid.is_invalid());
        assert!(
            ValidationStatus::Error {
                message: "x".to_string()
            }
            .is_error()
        );
        assert!(
            ValidationStatus::Skipped {
                reason: "x".to_string()
            }
            .is_skipped()
        );
        assert!(!ValidationStatus::Invalid.is_valid());
    }

    #[test]
    fn test_validation_results_aggregation() {
        let results = ValidationResults::aggregate(vec![
            FileValidationResult::valid(PathBuf::from("a.json"), Duration::from_millis(10)),
            FileValidationResult::valid(PathBuf::from("b.json"), Duration::from_millis(30)),
            FileValidationResult::invalid(PathBuf::from("c.json"), Duration::from_millis(20)),
            FileValidationResult::error(
                PathBuf::from("d.json"),
                ValidationError::Config("boom".to_string()),
                Duration::from_millis(20),
            ),
            FileValidationResult::skipped(PathBuf::from("e.json"), "later".to_string()),
        ]);

        assert_eq!(results.total_files, 5);
        assert_eq!(results.valid_files, 2);
        assert_eq!(results.invalid_files, 1);
        assert_eq!(results.error_files, 1);
        assert_eq!(results.skipped_files, 1);
        assert_eq!(results.total_duration, Duration::from_millis(80));
        assert_eq!(results.average_duration, Duration::from_millis(16));
        assert!(results.has_errors());
        assert!(!results.all_valid());
        assert!((results.success_rate() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validation_results_empty() {
        let results = ValidationResults::aggregate(Vec::new());
        assert_eq!(results.total_files, 0);
        assert!(!results.all_valid());
        assert!(!results.has_errors());
        assert_eq!(results.success_rate(), 0.0);
    }

    #[test]
    fn test_validate_single_file_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        let schema = object_schema();

        let valid = write_fixture(temp_dir.path(), "valid.json", r#"{"id": 7}"#);
        let invalid = write_fixture(temp_dir.path(), "invalid.json", r#"{"id": "7"}"#);
        let malformed = write_fixture(temp_dir.path(), "malformed.json", r#"{"id": "#);

        let result = ValidationEngine::validate_single_file(&schema, &valid);
        assert!(result.status.is_valid());
        let result = ValidationEngine::validate_single_file(&schema, &invalid);
        assert!(result.status.is_invalid());
        let result = ValidationEngine::validate_single_file(&schema, &malformed);
        match result.status {
            ValidationStatus::Error { message } => {
                assert!(message.contains("Instance parsing error"));
                assert!(message.contains("malformed.json"));
            }
            other => panic!("Expected Error status, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_single_file_missing() {
        let result =
            ValidationEngine::validate_single_file(&object_schema(), Path::new("/nonexistent.json"));
        assert!(result.status.is_error());
    }

    #[test]
    fn test_trailing_content_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_fixture(temp_dir.path(), "two.json", r#"{"id": 1} {"id": 2}"#);
        let result = ValidationEngine::validate_single_file(&object_schema(), &path);
        assert!(result.status.is_error());
    }

    #[test]
    fn test_concurrent_validation_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let engine = create_test_engine(false);
        let schema = object_schema();

        let files: Vec<PathBuf> = (0..20)
            .map(|i| {
                let content = if i % 3 == 0 {
                    r#"{"name": "missing id"}"#.to_string()
                } else {
                    format!(r#"{{"id": {}}}"#, i)
                };
                write_fixture(temp_dir.path(), &format!("file{:02}.json", i), &content)
            })
            .collect();

        let results = engine.validate_files(&schema, files.clone());

        assert_eq!(results.len(), 20);
        for (i, (result, path)) in results.iter().zip(&files).enumerate() {
            assert_eq!(&result.path, path);
            assert_eq!(result.status.is_invalid(), i % 3 == 0);
        }
    }

    #[test]
    fn test_fail_fast_skips_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ValidationEngine::new(ValidationConfig {
            max_concurrent_validations: 1,
            fail_fast: true,
        })
        .unwrap();

        let files = vec![
            write_fixture(temp_dir.path(), "a.json", r#"{"id": 1}"#),
            write_fixture(temp_dir.path(), "b.json", "[]"),
            write_fixture(temp_dir.path(), "c.json", r#"{"id": 3}"#),
        ];
        let results = ValidationResults::aggregate(engine.validate_files(&object_schema(), files));

        assert_eq!(results.invalid_files, 1);
        assert!(results.skipped_files <= 1);
        assert_eq!(
            results.valid_files + results.invalid_files + results.skipped_files,
            3
        );
    }

    #[test]
    fn test_validate_paths_workflow() {
        let temp_dir = TempDir::new().unwrap();
        let schema_path = write_fixture(temp_dir.path(), "schema.schema", r#"{"type": "array"}"#);
        let data = temp_dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        write_fixture(&data, "one.json", "[1, 2]");
        write_fixture(&data, "two.json", "{}");
        write_fixture(&data, "notes.txt", "ignored");

        let phases = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&phases);
        let callback: ProgressCallback = Arc::new(move |progress: ValidationProgress| {
            recorded.lock().unwrap().push(progress.phase);
        });

        let engine = create_test_engine(false);
        let results = engine
            .validate_paths_with_progress(
                &schema_path,
                &[data],
                &FileDiscovery::new(),
                Some(callback),
            )
            .unwrap();

        assert_eq!(results.total_files, 2);
        assert_eq!(results.valid_files, 1);
        assert_eq!(results.invalid_files, 1);
        assert_eq!(results.performance_metrics.schema_nodes, 1);

        let phases = phases.lock().unwrap();
        assert_eq!(phases.first(), Some(&ValidationPhase::SchemaLoading));
        assert_eq!(phases.last(), Some(&ValidationPhase::Complete));
        assert_eq!(
            phases
                .iter()
                .filter(|phase| **phase == ValidationPhase::Validation)
                .count(),
            2
        );
    }

    #[test]
    fn test_broken_schema_aborts_workflow() {
        let temp_dir = TempDir::new().unwrap();
        let schema_path = write_fixture(temp_dir.path(), "schema.schema", r#"{"minimum": "0"}"#);

        let engine = create_test_engine(false);
        let result = engine.validate_paths(
            &schema_path,
            &[temp_dir.path().to_path_buf()],
            &FileDiscovery::new(),
        );
        assert!(matches!(result, Err(ValidationError::SchemaLoading { .. })));
    }

    #[test]
    fn test_engine_accessors() {
        let engine = create_test_engine(true);
        assert_eq!(engine.config().max_concurrent_validations, 2);
        assert!(engine.config().fail_fast);
        assert_eq!(engine.schema_loader().compiled_count(), 0);
    }
}
