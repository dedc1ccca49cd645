//! Output formatting for resolved versions

use std::io::{self, Write};
use std::path::Path;

use crate::config::ConfigError;
use crate::module::ModuleName;
use crate::version::outcome::{VersionOutcome, VersionStatus};

const FAILED: &str = "(failed)";
const UNKNOWN: &str = "(unknown)";

/// Which optional fields each output line carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayConfig {
    pub show_name: bool,
    pub show_file: bool,
}

impl DisplayConfig {
    /// Derive the display configuration for a run
    ///
    /// Names are shown by default when more than one module (or every
    /// module) was requested. `always_name` / `never_name` override that and
    /// are mutually exclusive.
    pub fn resolve(
        multiple_targets: bool,
        always_name: bool,
        never_name: bool,
        show_file: bool,
    ) -> Result<Self, ConfigError> {
        let show_name = match (always_name, never_name) {
            (true, true) => return Err(ConfigError::ConflictingNameFlags),
            (true, false) => true,
            (false, true) => false,
            (false, false) => multiple_targets,
        };
        Ok(Self {
            show_name,
            show_file,
        })
    }
}

/// Format one report line, without the trailing newline
pub fn format_line(
    name: &ModuleName,
    file: Option<&Path>,
    outcome: &VersionOutcome,
    config: DisplayConfig,
) -> String {
    let status = match outcome.status() {
        VersionStatus::Failed => FAILED,
        VersionStatus::Unknown => UNKNOWN,
        VersionStatus::Version(version) => version,
    };

    let mut line = String::new();
    if config.show_name {
        line.push_str(&format!("{name}:\t"));
    }
    line.push_str(status);
    if let (true, Some(file)) = (config.show_file, file) {
        line.push('\t');
        line.push_str(&file.display().to_string());
    }
    line
}

/// Writes one line per module to an output stream
pub struct Reporter<W: Write> {
    out: W,
    config: DisplayConfig,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, config: DisplayConfig) -> Self {
        Self { out, config }
    }

    pub fn report(
        &mut self,
        name: &ModuleName,
        file: Option<&Path>,
        outcome: &VersionOutcome,
    ) -> io::Result<()> {
        writeln!(self.out, "{}", format_line(name, file, outcome, self.config))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
