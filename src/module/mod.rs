//! Module layer
//! - name.rs: ModuleName and its relative-path mapping
//! - search_path.rs: ordered search path with first-match-wins lookup

pub mod name;
pub mod search_path;

use std::path::PathBuf;

pub use name::{ModuleName, ModuleNameError};
pub use search_path::SearchPath;

/// A module discovered on the search path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub name: ModuleName,
    /// Absolute path of the module's source file
    pub file: PathBuf,
}
