use crate::error::{Result, ValidationError};
use globset::{GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Walks files and directories with `ignore`, keeping the files whose
/// extension and path patterns select them for validation.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// File extensions to include (e.g., ["json", "geojson"])
    extensions: Vec<String>,
    /// Include patterns set
    include_set: Option<GlobSet>,
    /// Exclude patterns set
    exclude_set: Option<GlobSet>,
    /// Maximum depth below the walk root (None = unlimited)
    max_depth: Option<usize>,
    /// Follow symbolic links
    follow_symlinks: bool,
}

impl FileDiscovery {
    /// Create a new FileDiscovery instance
    pub fn new() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            include_set: None,
            exclude_set: None,
            max_depth: None,
            follow_symlinks: false,
        }
    }

    /// Set file extensions to discover
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// Add include patterns
    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.include_set = build_glob_set(&patterns)?;
        Ok(self)
    }

    /// Add exclude patterns
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.exclude_set = build_glob_set(&patterns)?;
        Ok(self)
    }

    /// Set maximum traversal depth; files directly in the root are at depth 0
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set whether to follow symbolic links
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Discover files in the given path (file or directory), sorted
    pub fn discover_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        Ok(self.walk(path)?.0)
    }

    /// Discover files under every path, sorted and without duplicates
    pub fn discover_all(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in paths {
            files.extend(self.discover_files(path)?);
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn walk(&self, path: &Path) -> Result<(Vec<PathBuf>, usize)> {
        let metadata = std::fs::metadata(path)?;
        if metadata.is_file() {
            let files = if self.should_process(path) {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            };
            return Ok((files, 0));
        }
        if !metadata.is_dir() {
            return Err(ValidationError::FileSystemTraversal {
                path: path.to_path_buf(),
                reason: "not a regular file or directory".to_string(),
            });
        }

        let mut builder = WalkBuilder::new(path);
        builder
            .follow_links(self.follow_symlinks)
            .max_depth(self.max_depth.map(|depth| depth + 1));

        let mut files = Vec::new();
        let mut errors = 0;
        for entry in builder.build() {
            match entry {
                Ok(entry) => {
                    let is_file = entry.file_type().is_some_and(|t| t.is_file());
                    if is_file && self.should_process(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    // keep walking past unreadable entries
                    warn!(root = %path.display(), error = %e, "error while walking directory");
                    errors += 1;
                }
            }
        }
        files.sort();
        debug!(root = %path.display(), files = files.len(), errors, "discovered files");
        Ok((files, errors))
    }

    /// Check if a file should be processed based on extensions and patterns
    pub fn should_process(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        if !self.extensions.contains(&extension.to_lowercase()) {
            return false;
        }

        if let Some(exclude_set) = &self.exclude_set
            && exclude_set.is_match(path)
        {
            return false;
        }

        // if any include pattern is given, at least one must match
        if let Some(include_set) = &self.include_set {
            return include_set.is_match(path);
        }

        true
    }

    /// Get statistics about discovered files
    pub fn get_discovery_stats(&self, root: &Path) -> Result<DiscoveryStats> {
        let (files, errors) = self.walk(root)?;
        Ok(DiscoveryStats {
            files_found: files.len(),
            errors,
        })
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                ValidationError::Config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
        builder.add(glob);
    }

    let set = builder
        .build()
        .map_err(|e| ValidationError::Config(format!("Failed to build glob set: {}", e)))?;
    Ok(Some(set))
}

/// Statistics about file discovery operation
#[derive(Debug, Default, Clone)]
pub struct DiscoveryStats {
    pub files_found: usize,
    pub errors: usize,
}
