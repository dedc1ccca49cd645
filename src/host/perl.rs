//! `ModuleHost` backed by the `perl` interpreter
//!
//! Each load runs the interpreter with a small driver script that `require`s
//! the module and prints one tab-separated result line on a private copy of
//! stdout. The module's own stdout is folded into stderr, which the
//! interpreter inherits, so it lands wherever our stderr points during the
//! load (the null device when suppressed). Warnings are silenced by the
//! driver itself.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::host::{HostError, LoadError, LoadWatch, ModuleHost};
use crate::module::ModuleName;

const LOAD_SCRIPT: &str = r#"
my $module = shift;
open(my $result, '>&', \*STDOUT) or die "dup: $!";
open(STDOUT, '>&', \*STDERR);
$SIG{__WARN__} = sub {};
(my $file = "$module.pm") =~ s{::}{/}g;
my $ok = eval { require $file; 1 };
my $line;
if ($ok) {
    no strict 'refs';
    my $version = ${"${module}::VERSION"};
    $line = "1\t" . (defined $version ? "$version" : "");
} else {
    $line = "0\t" . (defined $@ ? "$@" : "unknown error");
}
$line =~ s/[\r\n]+/ /g;
print $result "$line\n";
close $result;
"#;

const SEARCH_PATH_SCRIPT: &str = r#"print "$_\n" for grep { !ref } @INC"#;

/// Host module system reached through a `perl` executable
pub struct PerlHost {
    interpreter: PathBuf,
    /// Directories passed with `-I`, searched before the interpreter's own
    includes: Vec<PathBuf>,
    /// Version attributes of modules loaded so far
    versions: HashMap<ModuleName, Option<String>>,
    /// Told about each load's interpreter process so an interrupt can stop it
    watch: Option<LoadWatch>,
}

impl PerlHost {
    pub fn new(interpreter: impl Into<PathBuf>, includes: Vec<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            includes,
            versions: HashMap::new(),
            watch: None,
        }
    }

    pub fn with_watch(mut self, watch: LoadWatch) -> Self {
        self.watch = Some(watch);
        self
    }

    pub fn interpreter(&self) -> &PathBuf {
        &self.interpreter
    }

    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    fn command(&self, script: &str) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        for dir in &self.includes {
            cmd.arg(format!("-I{}", dir.display()));
        }
        cmd.arg("-e").arg(script).stdin(Stdio::null());
        cmd
    }
}

impl ModuleHost for PerlHost {
    fn search_path(&self) -> Result<Vec<PathBuf>, HostError> {
        let output = self.command(SEARCH_PATH_SCRIPT).output()?;
        if !output.status.success() {
            return Err(HostError::Exited {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn load_module(&mut self, name: &ModuleName) -> Result<(), LoadError> {
        let child = self
            .command(LOAD_SCRIPT)
            .arg(name.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        if let Some(watch) = &self.watch {
            watch.attach_child(child.id());
        }
        let output = child.wait_with_output();
        if let Some(watch) = &self.watch {
            watch.detach_child();
        }
        let output = output?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let failed = |reason: String| LoadError::Failed {
            module: name.clone(),
            reason,
        };

        let line = stdout.lines().next().ok_or_else(|| {
            failed(format!(
                "interpreter exited with {} before reporting",
                output.status
            ))
        })?;

        match line.split_once('\t') {
            Some(("1", version)) => {
                debug!("Loaded {} (version {:?})", name, version);
                let version = (!version.is_empty()).then(|| version.to_string());
                self.versions.insert(name.clone(), version);
                Ok(())
            }
            Some(("0", reason)) => Err(failed(reason.trim().to_string())),
            _ => Err(failed(format!("unexpected interpreter output: {line:?}"))),
        }
    }

    fn version_attribute(&self, name: &ModuleName) -> Option<String> {
        self.versions.get(name).cloned().flatten()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Writes a fake interpreter that prints `output` and exits with `status`
    fn fake_interpreter(dir: &TempDir, output: &str, status: i32) -> PathBuf {
        let path = dir.path().join("fake-perl");
        fs::write(
            &path,
            format!("#!/bin/sh\nprintf '{output}'\nexit {status}\n"),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn module() -> ModuleName {
        "Foo::Bar".parse().unwrap()
    }

    #[test]
    fn load_module_records_version_attribute() {
        let dir = TempDir::new().unwrap();
        let mut host = PerlHost::new(fake_interpreter(&dir, "1\\t1.23\\n", 0), vec![]);

        host.load_module(&module()).unwrap();

        assert_eq!(host.version_attribute(&module()), Some("1.23".to_string()));
    }

    #[test]
    fn load_module_without_version_has_no_attribute() {
        let dir = TempDir::new().unwrap();
        let mut host = PerlHost::new(fake_interpreter(&dir, "1\\t\\n", 0), vec![]);

        host.load_module(&module()).unwrap();

        assert_eq!(host.version_attribute(&module()), None);
    }

    #[test]
    fn load_module_reports_host_error() {
        let dir = TempDir::new().unwrap();
        let mut host = PerlHost::new(
            fake_interpreter(&dir, "0\\tFoo/Bar.pm not found in @INC\\n", 0),
            vec![],
        );

        let err = host.load_module(&module()).unwrap_err();

        assert!(matches!(
            err,
            LoadError::Failed { reason, .. } if reason == "Foo/Bar.pm not found in @INC"
        ));
        assert_eq!(host.version_attribute(&module()), None);
    }

    #[test]
    fn load_module_fails_when_interpreter_dies_silently() {
        let dir = TempDir::new().unwrap();
        let mut host = PerlHost::new(fake_interpreter(&dir, "", 255), vec![]);

        assert!(matches!(
            host.load_module(&module()),
            Err(LoadError::Failed { .. })
        ));
    }

    #[test]
    fn load_module_releases_interpreter_process_from_watch() {
        let dir = TempDir::new().unwrap();
        let watch = LoadWatch::new();
        let mut host = PerlHost::new(fake_interpreter(&dir, "1\\t1.0\\n", 0), vec![])
            .with_watch(watch.clone());

        let _guard = watch.begin(&module(), false);
        host.load_module(&module()).unwrap();

        assert_eq!(watch.active_child(), None);
        assert_eq!(watch.active_module(), Some(module()));
    }

    #[test]
    fn load_module_fails_when_interpreter_is_missing() {
        let dir = TempDir::new().unwrap();
        let mut host = PerlHost::new(dir.path().join("no-such-perl"), vec![]);

        assert!(matches!(host.load_module(&module()), Err(LoadError::Io(_))));
    }

    #[test]
    fn search_path_lists_interpreter_output_lines() {
        let dir = TempDir::new().unwrap();
        let host = PerlHost::new(fake_interpreter(&dir, "/opt/lib\\n/usr/share/perl5\\n", 0), vec![]);

        assert_eq!(
            host.search_path().unwrap(),
            vec![PathBuf::from("/opt/lib"), PathBuf::from("/usr/share/perl5")]
        );
    }

    #[test]
    fn search_path_fails_when_interpreter_exits_non_zero() {
        let dir = TempDir::new().unwrap();
        let host = PerlHost::new(fake_interpreter(&dir, "", 2), vec![]);

        assert!(matches!(host.search_path(), Err(HostError::Exited { .. })));
    }
}
