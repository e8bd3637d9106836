use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failures
    Quiet,
    /// Show the summary
    #[default]
    Normal,
    /// Show every file that did not validate
    Verbose,
    /// Show every file and timing details
    Debug,
}

impl VerbosityLevel {
    /// Map `-q` and the number of `-v` flags to a level.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => VerbosityLevel::Quiet,
            (false, 0) => VerbosityLevel::Normal,
            (false, 1) => VerbosityLevel::Verbose,
            (false, _) => VerbosityLevel::Debug,
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Summary,
}

/// Streaming JSON Schema (draft-04) validation tool
#[derive(Parser, Debug, Clone)]
#[command(name = "validate-json")]
#[command(about = "Validate JSON files against a JSON Schema (draft-04) without loading them into memory")]
#[command(version)]
pub struct Cli {
    /// JSON Schema document to validate against
    #[arg(help = "JSON Schema file")]
    pub schema: PathBuf,

    /// Files or directories to validate
    #[arg(required = true, help = "Files or directories to validate")]
    pub paths: Vec<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// File extensions to process (comma-separated)
    #[arg(
        short = 'e',
        long = "extensions",
        help = "File extensions to process (e.g., 'json,geojson') [default: json]"
    )]
    pub extensions: Option<String>,

    /// Number of concurrent validation threads
    #[arg(
        short = 't',
        long = "threads",
        help = "Number of concurrent validation threads"
    )]
    pub threads: Option<usize>,

    /// Increase verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable quiet mode (failures only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Include file patterns (glob syntax)
    #[arg(long = "include", action = ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Exclude file patterns (glob syntax)
    #[arg(long = "exclude", action = ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Maximum directory depth to descend into
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Follow symbolic links while walking directories
    #[arg(long = "follow-symlinks")]
    pub follow_symlinks: bool,

    /// Stop validating after the first file that does not validate
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn get_extensions(&self) -> Option<Vec<String>> {
        self.extensions.as_deref().map(split_extensions)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.schema.is_file() {
            return Err(format!("Schema file does not exist: {}", self.schema.display()));
        }
        if let Some(missing) = self.paths.iter().find(|path| !path.exists()) {
            return Err(format!("Path does not exist: {}", missing.display()));
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.quiet, self.verbose)
    }
}

/// Split a comma-separated extension list, dropping blanks and leading dots.
pub fn split_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
