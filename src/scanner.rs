//! Enumerates every installed module on a search path
//!
//! The scan is lazy and restartable: each call to [`scan`] walks the
//! filesystem again. Within a root, the files of a directory are visited in
//! sorted order before its subdirectories, so `Foo.pm` is reported before
//! `Foo/Bar.pm` and repeated runs over an unchanged tree yield the same order.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SOURCE_EXTENSION;
use crate::module::{ModuleName, ModuleRecord, SearchPath};

/// Start a fresh scan of every root on the search path
pub fn scan(search_path: &SearchPath) -> PathScanner<'_> {
    PathScanner {
        roots: search_path.roots().iter(),
        current_root: PathBuf::new(),
        pending_dirs: VecDeque::new(),
        pending_files: VecDeque::new(),
        seen_dirs: HashSet::new(),
        seen_files: HashSet::new(),
        seen_names: HashSet::new(),
    }
}

/// Iterator over the modules of a search path, in search-path order
pub struct PathScanner<'a> {
    roots: std::slice::Iter<'a, PathBuf>,
    current_root: PathBuf,
    pending_dirs: VecDeque<PathBuf>,
    pending_files: VecDeque<PathBuf>,
    /// Canonical directories visited under the current root
    seen_dirs: HashSet<PathBuf>,
    /// Canonical paths of files already emitted
    seen_files: HashSet<PathBuf>,
    /// Names already emitted; later roots cannot override them
    seen_names: HashSet<ModuleName>,
}

impl Iterator for PathScanner<'_> {
    type Item = ModuleRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.pending_files.pop_front() {
                if let Some(record) = self.visit_file(file) {
                    return Some(record);
                }
                continue;
            }

            if let Some(dir) = self.pending_dirs.pop_front() {
                self.read_dir(&dir);
                continue;
            }

            let root = self.roots.next()?;
            if !root.is_dir() {
                debug!("Skipping search path entry {}: not a directory", root.display());
                continue;
            }
            // Cycle detection is per root: a root nested inside an earlier
            // one must still be walked under its own names
            self.seen_dirs.clear();
            self.current_root = root.clone();
            self.pending_dirs.push_back(root.clone());
        }
    }
}

impl PathScanner<'_> {
    fn read_dir(&mut self, dir: &Path) {
        let identity = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        if !self.seen_dirs.insert(identity) {
            debug!("Skipping already visited directory {}", dir.display());
            return;
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read directory {}: {}", dir.display(), e);
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| {
                entry
                    .inspect_err(|e| warn!("Failed to read entry in {}: {}", dir.display(), e))
                    .ok()
            })
            .map(|entry| entry.path())
            .collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                self.pending_dirs.push_back(path);
            } else if is_source_file(&path) {
                self.pending_files.push_back(path);
            }
        }
    }

    fn visit_file(&mut self, file: PathBuf) -> Option<ModuleRecord> {
        let relative = file.strip_prefix(&self.current_root).ok()?;
        let name = match ModuleName::from_relative_path(relative) {
            Ok(name) => name,
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                return None;
            }
        };

        if self.seen_names.contains(&name) {
            debug!("Skipping {}: {} is shadowed by an earlier root", file.display(), name);
            return None;
        }

        let identity = fs::canonicalize(&file).unwrap_or_else(|_| file.clone());
        if !self.seen_files.insert(identity) {
            debug!("Skipping {}: file already reported", file.display());
            return None;
        }
        self.seen_names.insert(name.clone());

        let file = std::path::absolute(&file).unwrap_or(file);
        Some(ModuleRecord { name, file })
    }
}

fn is_source_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION)
}
