//! Ordered search path with first-match-wins lookup

use std::path::PathBuf;

use tracing::debug;

use crate::module::name::ModuleName;

/// Ordered list of directory roots consulted when resolving a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    roots: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolve a module to the first existing source file along the path
    pub fn resolve(&self, name: &ModuleName) -> Option<PathBuf> {
        let relative = name.relative_path();
        let found = self
            .roots
            .iter()
            .map(|root| root.join(&relative))
            .find(|candidate| candidate.is_file());

        match &found {
            Some(file) => debug!("Resolved {} to {}", name, file.display()),
            None => debug!("{} not found on search path", name),
        }
        found
    }
}
