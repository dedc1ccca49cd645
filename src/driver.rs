//! Run orchestration: target resolution, strategy invocation and reporting
//!
//! Each module is processed on its own; a module that fails to load is
//! reported as "(failed)" and the run continues. Only configuration errors,
//! detected by [`Request::plan`] before any module is touched, abort a run.

use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, error};

use crate::config::ConfigError;
use crate::module::{ModuleName, SearchPath};
use crate::report::{DisplayConfig, Reporter};
use crate::scanner;
use crate::version::strategy::VersionStrategy;

/// What the user asked for, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub modules: Vec<String>,
    pub all: bool,
    pub always_name: bool,
    pub never_name: bool,
    pub show_file: bool,
}

/// Modules a run reports on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// Explicitly named modules, in request order
    Named(Vec<ModuleName>),
    /// Every module found on the search path
    All,
}

/// Validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub targets: Targets,
    pub display: DisplayConfig,
}

impl Request {
    /// Validate the request
    ///
    /// # Returns
    /// * `Ok(Plan)` - targets and display configuration for the run
    /// * `Err(ConfigError)` - conflicting or missing options, or an invalid module name
    pub fn plan(&self) -> Result<Plan, ConfigError> {
        let targets = match (self.all, self.modules.is_empty()) {
            (true, false) => return Err(ConfigError::NamesWithAll),
            (true, true) => Targets::All,
            (false, true) => return Err(ConfigError::NoTargets),
            (false, false) => Targets::Named(
                self.modules
                    .iter()
                    .map(|m| m.parse::<ModuleName>())
                    .collect::<Result<_, _>>()?,
            ),
        };

        let multiple_targets = match &targets {
            Targets::All => true,
            Targets::Named(names) => names.len() > 1,
        };
        let display = DisplayConfig::resolve(
            multiple_targets,
            self.always_name,
            self.never_name,
            self.show_file,
        )?;

        Ok(Plan { targets, display })
    }
}

/// Counts from a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Lines written to the output
    pub reported: usize,
    /// Modules whose resolution hit an internal error instead of an outcome
    pub internal_errors: usize,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.internal_errors == 0
    }
}

/// Runs a plan with one strategy over one search path
pub struct Driver<'a> {
    search_path: &'a SearchPath,
    strategy: &'a dyn VersionStrategy,
}

impl<'a> Driver<'a> {
    pub fn new(search_path: &'a SearchPath, strategy: &'a dyn VersionStrategy) -> Self {
        Self {
            search_path,
            strategy,
        }
    }

    /// Report every target of `plan` to `out`, in target order
    ///
    /// Internal errors are written to `diag` and counted; they do not stop
    /// the run. When the reader of `out` goes away the run ends quietly with
    /// what was reported so far.
    pub async fn run<W: Write, E: Write>(
        &self,
        plan: &Plan,
        out: W,
        mut diag: E,
    ) -> io::Result<RunSummary> {
        let mut reporter = Reporter::new(out, plan.display);
        let mut summary = RunSummary::default();

        let result = self
            .report_targets(plan, &mut reporter, &mut diag, &mut summary)
            .await;
        match result {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("Output closed after {} lines", summary.reported);
                Ok(summary)
            }
            result => result.map(|()| summary),
        }
    }

    async fn report_targets<W: Write, E: Write>(
        &self,
        plan: &Plan,
        reporter: &mut Reporter<W>,
        diag: &mut E,
        summary: &mut RunSummary,
    ) -> io::Result<()> {
        match &plan.targets {
            Targets::Named(names) => {
                let resolve_file = self.strategy.kind().needs_file() || plan.display.show_file;
                for name in names {
                    let file = if resolve_file {
                        self.search_path.resolve(name)
                    } else {
                        None
                    };
                    self.process(name, file.as_deref(), reporter, diag, summary)
                        .await?;
                }
            }
            Targets::All => {
                for record in scanner::scan(self.search_path) {
                    self.process(&record.name, Some(&record.file), reporter, diag, summary)
                        .await?;
                }
            }
        }

        reporter.flush()?;
        diag.flush()
    }

    async fn process<W: Write, E: Write>(
        &self,
        name: &ModuleName,
        file: Option<&Path>,
        reporter: &mut Reporter<W>,
        diag: &mut E,
        summary: &mut RunSummary,
    ) -> io::Result<()> {
        match self.strategy.resolve(name, file).await {
            Ok(outcome) => {
                debug!("{} -> {:?}", name, outcome);
                reporter.report(name, file, &outcome)?;
                summary.reported += 1;
            }
            Err(e) => {
                error!("{}", e);
                writeln!(diag, "modvers: internal error: {e}")?;
                summary.internal_errors += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleNameError;
    use crate::version::text_scan::TextScanner;

    fn request(modules: &[&str]) -> Request {
        Request {
            modules: modules.iter().map(|m| m.to_string()).collect(),
            ..Request::default()
        }
    }

    #[test]
    fn plan_hides_name_for_single_module() {
        let plan = request(&["Foo"]).plan().unwrap();

        assert_eq!(plan.targets, Targets::Named(vec!["Foo".parse().unwrap()]));
        assert!(!plan.display.show_name);
    }

    #[test]
    fn plan_shows_name_for_multiple_modules_and_all() {
        assert!(request(&["Foo", "Bar"]).plan().unwrap().display.show_name);

        let all = Request {
            all: true,
            ..Request::default()
        };
        let plan = all.plan().unwrap();
        assert_eq!(plan.targets, Targets::All);
        assert!(plan.display.show_name);
    }

    #[test]
    fn plan_rejects_conflicting_name_flags() {
        let conflicting = Request {
            always_name: true,
            never_name: true,
            ..request(&["Foo"])
        };

        assert!(matches!(
            conflicting.plan(),
            Err(ConfigError::ConflictingNameFlags)
        ));
    }

    #[test]
    fn plan_rejects_names_with_all() {
        let both = Request {
            all: true,
            ..request(&["Foo"])
        };

        assert!(matches!(both.plan(), Err(ConfigError::NamesWithAll)));
    }

    #[test]
    fn plan_requires_targets() {
        assert!(matches!(Request::default().plan(), Err(ConfigError::NoTargets)));
    }

    /// Writer whose reader has gone away
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    /// Writer failing with an error other than a closed pipe
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::StorageFull.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn scanner_plan(modules: &[&str]) -> Plan {
        request(modules).plan().unwrap()
    }

    #[tokio::test]
    async fn run_stops_quietly_when_output_is_closed() {
        let search_path = SearchPath::default();
        let strategy = TextScanner::new();
        let mut diag = Vec::new();

        let summary = Driver::new(&search_path, &strategy)
            .run(&scanner_plan(&["Foo", "Bar"]), ClosedPipe, &mut diag)
            .await
            .unwrap();

        assert_eq!(summary.reported, 0);
        assert!(summary.success());
        assert!(diag.is_empty());
    }

    #[tokio::test]
    async fn run_propagates_other_output_errors() {
        let search_path = SearchPath::default();
        let strategy = TextScanner::new();

        let err = Driver::new(&search_path, &strategy)
            .run(&scanner_plan(&["Foo"]), FullDisk, Vec::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
    }

    #[test]
    fn plan_rejects_invalid_module_names() {
        assert!(matches!(
            request(&["Foo", "Bad;Name"]).plan(),
            Err(ConfigError::InvalidModuleName(ModuleNameError::InvalidSegment { .. }))
        ));
    }
}
