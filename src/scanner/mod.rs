//! Source file scanner for the data directory.
//!
//! This module finds the period spreadsheets to load, skipping the
//! consolidated output file so a run never ingests its own result.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["xlsx", "csv"])
    pub extensions: Vec<String>,
    /// File names to exclude (the consolidated output)
    pub excludes: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["xlsx", "xls", "ods", "csv"]
                .into_iter()
                .map(String::from)
                .collect(),
            excludes: vec!["dados_anuais.xlsx".to_string()],
        }
    }
}

impl From<&crate::config::Config> for ScanConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            extensions: config.report.extensions.clone(),
            excludes: vec![config.paths.consolidated_file.clone()],
        }
    }
}

/// Scanned file information.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Full path of the spreadsheet.
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Lowercased file extension (without dot)
    pub extension: String,
}

/// File scanner for discovering source spreadsheets.
pub struct FileScanner {
    config: ScanConfig,
    data_dir: PathBuf,
}

impl FileScanner {
    /// Create a new file scanner.
    pub fn new(data_dir: PathBuf, config: ScanConfig) -> Self {
        Self { config, data_dir }
    }

    /// Scan the top level of the data directory, sorted by file name.
    ///
    /// Fails when the directory itself cannot be listed. Unreadable entries
    /// inside it are skipped.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.data_dir.is_dir() {
            bail!("{} is not a directory", self.data_dir.display());
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.data_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) if e.depth() == 0 => {
                    return Err(e).with_context(|| {
                        format!("Cannot read directory {}", self.data_dir.display())
                    });
                }
                Err(e) => {
                    debug!("Cannot read entry in {}: {}", self.data_dir.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(ScannedFile {
                path: entry.path().to_path_buf(),
                size,
                extension: extension_of(entry.path()),
            });
        }

        Ok(files)
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.is_excluded(name) {
                return false;
            }
        } else {
            return false;
        }

        let ext = extension_of(path);
        self.config
            .extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&ext))
    }

    /// Hidden files, Office lock files and explicit excludes.
    fn is_excluded(&self, name: &str) -> bool {
        if name.starts_with('.') || name.starts_with("~$") {
            return true;
        }

        self.config
            .excludes
            .iter()
            .any(|pattern| name.eq_ignore_ascii_case(pattern))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}
