use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const CONFIG_NAMES: [&str; 4] = [
    "validate-json.toml",
    "validate-json.json",
    ".validate-json.toml",
    ".validate-json.json",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationConfig,
    pub output: OutputConfig,
    pub files: FileConfig,
}

/// Validation-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationConfig {
    /// Number of concurrent validation threads
    pub threads: Option<usize>,
    /// Stop validation on the first file that does not validate
    pub fail_fast: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format
    pub format: OutputFormat,
    /// Verbosity, as a count of `-v` flags
    pub verbose: u8,
    /// Quiet mode (failures only)
    pub quiet: bool,
}

impl OutputConfig {
    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.quiet, self.verbose)
    }
}

/// File processing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// File extensions to process
    pub extensions: Vec<String>,
    /// Include patterns (glob syntax)
    pub include_patterns: Vec<String>,
    /// Exclude patterns (glob syntax)
    pub exclude_patterns: Vec<String>,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Follow symbolic links
    pub follow_symlinks: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            include_patterns: vec![],
            exclude_patterns: vec![],
            max_depth: None,
            follow_symlinks: false,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, cli)
    }

    /// Like [`ConfigManager::load_config`], reading the environment through `env`
    pub fn load_config_with(env: &impl EnvProvider, cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path)?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file()? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading configuration file");

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => match toml::from_str::<Config>(&content) {
                Ok(config) => Ok(config),
                Err(_) => Ok(serde_json::from_str(&content)?),
            },
        }
    }

    /// Find configuration file in the working directory, then the user config directory
    pub fn find_config_file() -> Result<Option<Config>> {
        let mut candidates: Vec<PathBuf> = CONFIG_NAMES.iter().map(PathBuf::from).collect();
        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("validate-json");
            candidates.extend(CONFIG_NAMES.iter().map(|name| app_config_dir.join(name)));
        }

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Ok(Some(Self::load_from_file(path)?)),
            None => Ok(None),
        }
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(threads) = env.get("VALIDATE_JSON_THREADS") {
            config.validation.threads = Some(parse_env("VALIDATE_JSON_THREADS", &threads)?);
        }
        if let Some(fail_fast) = env.get("VALIDATE_JSON_FAIL_FAST") {
            config.validation.fail_fast = parse_env("VALIDATE_JSON_FAIL_FAST", &fail_fast)?;
        }

        if let Some(verbose) = env.get("VALIDATE_JSON_VERBOSE") {
            config.output.verbose = parse_env("VALIDATE_JSON_VERBOSE", &verbose)?;
        }
        if let Some(quiet) = env.get("VALIDATE_JSON_QUIET") {
            config.output.quiet = parse_env("VALIDATE_JSON_QUIET", &quiet)?;
        }
        if let Some(format) = env.get("VALIDATE_JSON_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormat::Human,
                "json" => OutputFormat::Json,
                "summary" => OutputFormat::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid VALIDATE_JSON_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        if let Some(extensions) = env.get("VALIDATE_JSON_EXTENSIONS") {
            config.files.extensions = crate::cli::split_extensions(&extensions);
        }
        if let Some(max_depth) = env.get("VALIDATE_JSON_MAX_DEPTH") {
            config.files.max_depth = Some(parse_env("VALIDATE_JSON_MAX_DEPTH", &max_depth)?);
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence where given)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if cli.threads.is_some() {
            config.validation.threads = cli.threads;
        }
        if cli.fail_fast {
            config.validation.fail_fast = true;
        }

        if let Some(format) = cli.output_format {
            config.output.format = format;
        }
        if cli.verbose > 0 {
            config.output.verbose = cli.verbose;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = 0;
        }

        if let Some(extensions) = cli.get_extensions() {
            config.files.extensions = extensions;
        }
        if !cli.include_patterns.is_empty() {
            config.files.include_patterns = cli.include_patterns.clone();
        }
        if !cli.exclude_patterns.is_empty() {
            config.files.exclude_patterns = cli.exclude_patterns.clone();
        }
        if cli.max_depth.is_some() {
            config.files.max_depth = cli.max_depth;
        }
        if cli.follow_symlinks {
            config.files.follow_symlinks = true;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-None values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        if override_config.validation.threads.is_some() {
            base.validation.threads = override_config.validation.threads;
        }
        base.validation.fail_fast = override_config.validation.fail_fast;

        base.output = override_config.output;

        if !override_config.files.extensions.is_empty() {
            base.files.extensions = override_config.files.extensions;
        }
        if !override_config.files.include_patterns.is_empty() {
            base.files.include_patterns = override_config.files.include_patterns;
        }
        if !override_config.files.exclude_patterns.is_empty() {
            base.files.exclude_patterns = override_config.files.exclude_patterns;
        }
        if override_config.files.max_depth.is_some() {
            base.files.max_depth = override_config.files.max_depth;
        }
        base.files.follow_symlinks = override_config.files.follow_symlinks;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.validation.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.output.verbose > 0 && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one file extension must be specified".to_string(),
            ));
        }
        for ext in &config.files.extensions {
            if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid file extension: {}",
                    ext
                )));
            }
        }

        Ok(())
    }

    /// Get the effective thread count
    pub fn get_thread_count(config: &Config) -> usize {
        config.validation.threads.unwrap_or_else(num_cpus::get)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}
