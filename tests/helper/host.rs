//! In-memory module host

use std::collections::HashMap;
use std::path::PathBuf;

use modvers::host::{HostError, LoadError, ModuleHost};
use modvers::module::ModuleName;

/// Host that "loads" a fixed set of modules
#[derive(Default)]
pub struct FakeHost {
    modules: HashMap<String, Option<String>>,
    loaded: HashMap<ModuleName, Option<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: &str, version: Option<&str>) -> Self {
        self.modules
            .insert(name.to_string(), version.map(str::to_string));
        self
    }
}

impl ModuleHost for FakeHost {
    fn search_path(&self) -> Result<Vec<PathBuf>, HostError> {
        Ok(Vec::new())
    }

    fn load_module(&mut self, name: &ModuleName) -> Result<(), LoadError> {
        match self.modules.get(&name.to_string()) {
            Some(version) => {
                self.loaded.insert(name.clone(), version.clone());
                Ok(())
            }
            None => Err(LoadError::Failed {
                module: name.clone(),
                reason: format!("{name} not found"),
            }),
        }
    }

    fn version_attribute(&self, name: &ModuleName) -> Option<String> {
        self.loaded.get(name).cloned().flatten()
    }
}
