use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use validate_json::cli::{Cli, VerbosityLevel};
use validate_json::config::{Config, ConfigManager};
use validate_json::{FileDiscovery, Output, ValidationConfig, ValidationEngine};

/// Every file valid
const EXIT_VALID: u8 = 0;
/// At least one file invalid or unreadable
const EXIT_INVALID: u8 = 1;
/// Usage, configuration or schema problems
const EXIT_USAGE: u8 = 2;

fn init_tracing(verbosity: VerbosityLevel) {
    let default_level = match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "warn",
        VerbosityLevel::Verbose => "info",
        VerbosityLevel::Debug => "debug",
    };
    // RUST_LOG wins over the -v count
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("validate_json={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    cli.validate().map_err(anyhow::Error::msg)?;
    ConfigManager::load_config(cli).context("Failed to load configuration")
}

fn run(cli: &Cli, config: &Config) -> Result<bool> {
    let discovery = FileDiscovery::new()
        .with_extensions(config.files.extensions.clone())
        .with_include_patterns(config.files.include_patterns.clone())?
        .with_exclude_patterns(config.files.exclude_patterns.clone())?
        .with_max_depth(config.files.max_depth)
        .with_follow_symlinks(config.files.follow_symlinks);

    let engine = ValidationEngine::new(ValidationConfig {
        max_concurrent_validations: ConfigManager::get_thread_count(config),
        fail_fast: config.validation.fail_fast,
    })?;

    let results = engine
        .validate_paths(&cli.schema, &cli.paths, &discovery)
        .with_context(|| format!("Failed to validate against {}", cli.schema.display()))?;

    let output = Output::new(config.output.format, config.output.verbosity());
    let schema = cli.schema.display().to_string();
    print!("{}", output.render(&schema, &results)?);

    Ok(!results.has_errors())
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbosity());

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    debug!(?config, "effective configuration");

    match run(&cli, &config) {
        Ok(true) => ExitCode::from(EXIT_VALID),
        Ok(false) => ExitCode::from(EXIT_INVALID),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}
