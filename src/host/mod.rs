//! Host module system
//!
//! The tool never reimplements the host's module loader. Loading modules,
//! reading their version attribute and discovering the default search path
//! all go through [`ModuleHost`].
//!
//! # Modules
//!
//! - [`perl`]: `ModuleHost` backed by the `perl` interpreter
//! - [`streams`]: stdout/stderr suppression during loads and the interrupt watch

pub mod perl;
pub mod streams;

use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::module::ModuleName;

pub use perl::PerlHost;
pub use streams::{LoadGuard, LoadWatch};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load {module}: {reason}")]
    Failed { module: ModuleName, reason: String },

    #[error("failed to run host interpreter: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to run host interpreter: {0}")]
    Io(#[from] std::io::Error),

    #[error("host interpreter exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },
}

/// Narrow interface to the host's module system
#[cfg_attr(test, automock)]
pub trait ModuleHost: Send {
    /// Directories the host searches for modules, in lookup order
    fn search_path(&self) -> Result<Vec<PathBuf>, HostError>;

    /// Load and initialize a module, with the host's own warnings silenced
    fn load_module(&mut self, name: &ModuleName) -> Result<(), LoadError>;

    /// The version attribute of a loaded module, if it has one
    fn version_attribute(&self, name: &ModuleName) -> Option<String>;
}
