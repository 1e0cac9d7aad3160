use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::parsers::RegistryFormat;

/// Finds registry files (CSV / JSON, optionally gzipped) under the given paths
pub struct RegistryDiscovery {
    recursive: bool,
}

impl RegistryDiscovery {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    /// Expand files and directories into registry files, de-duplicated in input order
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in paths {
            if path.is_file() {
                if self.is_registry_file(path) {
                    files.push(path.clone());
                } else {
                    warn!("Skipping {}: not a registry file", path.display());
                }
            } else if path.is_dir() {
                files.extend(self.discover_in_directory(path)?);
            } else {
                warn!("Skipping {}: no such file or directory", path.display());
            }
        }

        let mut seen = HashSet::new();
        files.retain(|path| seen.insert(path.clone()));

        debug!("Discovered {} registry file(s)", files.len());
        Ok(files)
    }

    fn discover_in_directory(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if self.recursive {
            for entry in WalkDir::new(dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && self.is_registry_file(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .collect();
            entries.sort();

            files.extend(
                entries
                    .into_iter()
                    .filter(|path| path.is_file() && self.is_registry_file(path)),
            );
        }

        Ok(files)
    }

    fn is_registry_file(&self, path: &Path) -> bool {
        RegistryFormat::from_path(path).is_some()
    }
}
