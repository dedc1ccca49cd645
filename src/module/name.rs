//! Hierarchical module names and their file-path mapping

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::config::{NAME_SEPARATOR, SOURCE_EXTENSION};

/// Error type for module name parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleNameError {
    #[error("empty module name")]
    Empty,

    #[error("invalid module name '{name}': bad segment '{segment}'")]
    InvalidSegment { name: String, segment: String },

    #[error("{0:?} is not a .{ext} file", ext = SOURCE_EXTENSION)]
    NotASourceFile(PathBuf),

    #[error("{0:?} is not a valid relative module path")]
    InvalidPath(PathBuf),
}

/// A module name such as `Foo::Bar`
///
/// Every segment is an identifier (`[A-Za-z_][A-Za-z0-9_]*`), so a name is
/// always convertible to the relative source path `Foo/Bar.pm` and back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleName {
    segments: Vec<String>,
}

impl ModuleName {
    /// Build a name from the path of a source file relative to a search-path root
    pub fn from_relative_path(path: &Path) -> Result<Self, ModuleNameError> {
        let invalid = || ModuleNameError::InvalidPath(path.to_path_buf());

        if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
            return Err(ModuleNameError::NotASourceFile(path.to_path_buf()));
        }

        let stem = path.with_extension("");
        let mut segments = Vec::new();
        for component in stem.components() {
            let Component::Normal(part) = component else {
                return Err(invalid());
            };
            segments.push(part.to_str().ok_or_else(invalid)?.to_string());
        }

        Self::from_segments(segments)
    }

    fn from_segments(segments: Vec<String>) -> Result<Self, ModuleNameError> {
        if segments.is_empty() {
            return Err(ModuleNameError::Empty);
        }
        if let Some(bad) = segments.iter().find(|s| !is_identifier(s)) {
            return Err(ModuleNameError::InvalidSegment {
                name: segments.join(NAME_SEPARATOR),
                segment: bad.clone(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Relative source path for this module, e.g. `Foo/Bar.pm`
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.segments.iter().collect();
        path.set_extension(SOURCE_EXTENSION);
        path
    }
}

impl FromStr for ModuleName {
    type Err = ModuleNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ModuleNameError::Empty);
        }
        Self::from_segments(s.split(NAME_SEPARATOR).map(str::to_string).collect())
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(NAME_SEPARATOR))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
