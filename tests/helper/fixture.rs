//! On-disk module trees

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use modvers::module::SearchPath;

/// A temporary directory holding one or more search path roots
pub struct ModuleTree {
    dir: TempDir,
}

impl ModuleTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Path of the root named `root`, created if needed
    pub fn root(&self, root: &str) -> PathBuf {
        let path = self.dir.path().join(root);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Write the source of module `name` (e.g. `Foo::Bar`) under `root`
    pub fn module(&self, root: &str, name: &str, source: &str) -> PathBuf {
        let mut path = self.root(root);
        path.extend(name.split("::"));
        path.set_extension("pm");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, source).unwrap();
        path
    }

    /// Search path made of the given roots, in order
    pub fn search_path(&self, roots: &[&str]) -> SearchPath {
        SearchPath::new(roots.iter().map(|root| self.root(root)))
    }
}
