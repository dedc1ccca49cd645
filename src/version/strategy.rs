//! Version strategy trait and run-wide strategy selection

use std::path::Path;

use crate::config::ConfigError;
use crate::module::ModuleName;
use crate::version::error::StrategyError;
use crate::version::outcome::VersionOutcome;
use crate::version::text_scan::TextScanner;

/// Which strategy a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Read the version line from the source file
    #[default]
    TextScan,
    /// Load the module in this process
    InProcess,
    /// Load the module in a worker process
    Subprocess,
}

impl StrategyKind {
    /// Returns the name accepted by `--method`
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::TextScan => "text",
            StrategyKind::InProcess => "load",
            StrategyKind::Subprocess => "subprocess",
        }
    }

    /// Whether the strategy needs the module's source file
    pub fn needs_file(&self) -> bool {
        matches!(self, StrategyKind::TextScan)
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(StrategyKind::TextScan),
            "load" => Ok(StrategyKind::InProcess),
            "subprocess" => Ok(StrategyKind::Subprocess),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Resolves the version of one module
#[async_trait::async_trait]
pub trait VersionStrategy: Send + Sync {
    /// Returns the kind of this strategy
    fn kind(&self) -> StrategyKind;

    /// Resolve the version of `name`
    ///
    /// `file` is the module's resolved source file, if any. Strategies that
    /// load modules ignore it.
    ///
    /// # Returns
    /// * `Ok(VersionOutcome)` - including "failed" outcomes for missing or broken modules
    /// * `Err(StrategyError)` - only for faults that must not be reported as "(failed)"
    async fn resolve(
        &self,
        name: &ModuleName,
        file: Option<&Path>,
    ) -> Result<VersionOutcome, StrategyError>;
}

#[async_trait::async_trait]
impl VersionStrategy for TextScanner {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TextScan
    }

    async fn resolve(
        &self,
        name: &ModuleName,
        file: Option<&Path>,
    ) -> Result<VersionOutcome, StrategyError> {
        let Some(file) = file else {
            tracing::debug!("{} has no source file", name);
            return Ok(VersionOutcome::failed());
        };
        Ok(self.scan_file(file).await)
    }
}
