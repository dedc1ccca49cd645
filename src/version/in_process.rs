//! Version resolution by loading the module in this process

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::host::{LoadWatch, ModuleHost};
use crate::module::ModuleName;
use crate::version::error::StrategyError;
use crate::version::outcome::VersionOutcome;
use crate::version::strategy::{StrategyKind, VersionStrategy};

/// Load `name` through `host` with output suppressed, then read its version
///
/// The streams are restored before this returns, whether the load succeeded
/// or not. Also used by the subprocess worker.
pub fn load_version(host: &mut dyn ModuleHost, name: &ModuleName, watch: &LoadWatch) -> VersionOutcome {
    let loaded = {
        let _guard = watch.begin(name, true);
        host.load_module(name)
    };

    match loaded {
        Ok(()) => VersionOutcome::loaded(host.version_attribute(name)),
        Err(e) => {
            debug!("{}", e);
            VersionOutcome::failed()
        }
    }
}

/// Strategy that loads modules into the current process's host
pub struct InProcessLoad<H: ModuleHost> {
    host: Mutex<H>,
    watch: LoadWatch,
}

impl<H: ModuleHost> InProcessLoad<H> {
    pub fn new(host: H, watch: LoadWatch) -> Self {
        Self {
            host: Mutex::new(host),
            watch,
        }
    }
}

#[async_trait::async_trait]
impl<H: ModuleHost> VersionStrategy for InProcessLoad<H> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InProcess
    }

    async fn resolve(
        &self,
        name: &ModuleName,
        _file: Option<&Path>,
    ) -> Result<VersionOutcome, StrategyError> {
        let mut host = self.host.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(load_version(&mut *host, name, &self.watch))
    }
}
