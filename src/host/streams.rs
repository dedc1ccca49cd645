//! Output suppression during module loads and the run-scoped interrupt watch
//!
//! While a module is loading, the process's stdout and stderr belong to the
//! load: [`LoadWatch::begin`] points both at the null device and hands back a
//! [`LoadGuard`] that restores them when dropped. The watch also remembers
//! which module is loading and which host process is running the load, so
//! the Ctrl-C handler can stop that process, restore the real streams and
//! name the module before exiting.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, warn};

use crate::config::EXIT_INTERRUPTED;
use crate::module::ModuleName;

/// Tracks the module currently being loaded
#[derive(Clone, Default)]
pub struct LoadWatch {
    active: Arc<Mutex<Option<ActiveLoad>>>,
}

struct ActiveLoad {
    module: ModuleName,
    saved: Option<sys::SavedStreams>,
    /// Process id of the host or worker process running the load
    child: Option<u32>,
}

impl LoadWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `module` as loading until the returned guard is dropped
    ///
    /// With `suppress_output`, stdout and stderr are redirected to the null
    /// device for the guard's lifetime. A failed redirect is logged and the
    /// load proceeds with the real streams.
    pub fn begin(&self, module: &ModuleName, suppress_output: bool) -> LoadGuard<'_> {
        let saved = if suppress_output {
            sys::SavedStreams::suppress()
                .inspect_err(|e| warn!("Failed to suppress output while loading {}: {}", module, e))
                .ok()
        } else {
            None
        };

        *self.lock() = Some(ActiveLoad {
            module: module.clone(),
            saved,
            child: None,
        });
        LoadGuard { watch: self }
    }

    /// The module currently being loaded, if any
    pub fn active_module(&self) -> Option<ModuleName> {
        self.lock().as_ref().map(|active| active.module.clone())
    }

    /// Record the process running the current load
    ///
    /// Ignored when no load is active. Call [`LoadWatch::detach_child`] once
    /// the process has been reaped.
    pub fn attach_child(&self, pid: u32) {
        if let Some(active) = self.lock().as_mut() {
            active.child = Some(pid);
        }
    }

    pub fn detach_child(&self) {
        if let Some(active) = self.lock().as_mut() {
            active.child = None;
        }
    }

    /// Process id of the process running the current load, if any
    pub fn active_child(&self) -> Option<u32> {
        self.lock().as_ref().and_then(|active| active.child)
    }

    /// Kill the loading process, restore any redirected streams and return
    /// the module that was loading
    pub fn interrupt(&self) -> Option<ModuleName> {
        let active = self.lock().take()?;
        if let Some(pid) = active.child {
            if let Err(e) = sys::kill_child(pid) {
                warn!("Failed to stop process {} loading {}: {}", pid, active.module, e);
            }
        }
        if let Some(saved) = active.saved {
            if let Err(e) = saved.restore() {
                error!("Failed to restore output streams: {}", e);
            }
        }
        Some(active.module)
    }

    /// Listen for Ctrl-C for the rest of the run
    ///
    /// On interrupt the real streams are restored, the loading module (if
    /// any) is reported on stderr, and the process exits.
    pub fn spawn_interrupt_handler(&self) -> tokio::task::JoinHandle<()> {
        let watch = self.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for interrupts: {}", e);
                return;
            }
            if let Some(module) = watch.interrupt() {
                eprintln!("modvers: interrupted while loading {module}");
            }
            std::process::exit(EXIT_INTERRUPTED);
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveLoad>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Restores the streams and clears the active module on drop
pub struct LoadGuard<'a> {
    watch: &'a LoadWatch,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let Some(active) = self.watch.lock().take() else {
            return;
        };
        if let Some(saved) = active.saved {
            if let Err(e) = saved.restore() {
                error!("Failed to restore output streams after loading {}: {}", active.module, e);
            }
        }
    }
}

#[cfg(unix)]
mod sys {
    use std::fs::OpenOptions;
    use std::io::{self, Write};
    use std::os::fd::OwnedFd;

    use nix::sys::signal::{Signal, kill};
    use nix::unistd::{Pid, dup, dup2_stderr, dup2_stdout};

    pub fn kill_child(pid: u32) -> io::Result<()> {
        let pid = i32::try_from(pid).map_err(io::Error::other)?;
        kill(Pid::from_raw(pid), Signal::SIGKILL)?;
        Ok(())
    }

    /// Duplicates of the original stdout/stderr descriptors
    pub struct SavedStreams {
        stdout: OwnedFd,
        stderr: OwnedFd,
    }

    impl SavedStreams {
        pub fn suppress() -> io::Result<Self> {
            let null = OpenOptions::new().write(true).open("/dev/null")?;
            let _ = io::stdout().flush();
            let _ = io::stderr().flush();

            let saved = Self {
                stdout: dup(io::stdout())?,
                stderr: dup(io::stderr())?,
            };
            if let Err(e) = dup2_stdout(&null).and_then(|()| dup2_stderr(&null)) {
                let _ = saved.restore();
                return Err(e.into());
            }
            Ok(saved)
        }

        pub fn restore(&self) -> io::Result<()> {
            // Anything the module left in our buffer belongs to the null device
            let _ = io::stdout().flush();
            dup2_stdout(&self.stdout)?;
            dup2_stderr(&self.stderr)?;
            Ok(())
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use std::io;

    pub struct SavedStreams;

    pub fn kill_child(_pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "stopping a loading process requires a unix platform",
        ))
    }

    impl SavedStreams {
        pub fn suppress() -> io::Result<Self> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "output suppression requires a unix platform",
            ))
        }

        pub fn restore(&self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::MetadataExt;
    use std::os::unix::process::ExitStatusExt;
    use std::process::Command;

    fn identity(path: &str) -> (u64, u64) {
        let meta = std::fs::metadata(path).unwrap();
        (meta.dev(), meta.ino())
    }

    fn module() -> ModuleName {
        "Noisy::Module".parse().unwrap()
    }

    #[test]
    #[serial]
    fn begin_redirects_stdout_and_stderr_until_guard_drops() {
        let watch = LoadWatch::new();
        let original = (identity("/dev/fd/1"), identity("/dev/fd/2"));
        let null = identity("/dev/null");

        let guard = watch.begin(&module(), true);
        let during = (identity("/dev/fd/1"), identity("/dev/fd/2"));
        drop(guard);
        let after = (identity("/dev/fd/1"), identity("/dev/fd/2"));

        assert_eq!(during, (null, null));
        assert_eq!(after, original);
    }

    #[test]
    #[serial]
    fn begin_without_suppression_leaves_streams_alone() {
        let watch = LoadWatch::new();
        let original = identity("/dev/fd/1");

        let _guard = watch.begin(&module(), false);

        assert_eq!(identity("/dev/fd/1"), original);
        assert_eq!(watch.active_module(), Some(module()));
    }

    #[test]
    #[serial]
    fn interrupt_restores_streams_and_reports_module() {
        let watch = LoadWatch::new();
        let original = identity("/dev/fd/2");

        let guard = watch.begin(&module(), true);
        let interrupted = watch.interrupt();

        assert_eq!(interrupted, Some(module()));
        assert_eq!(identity("/dev/fd/2"), original);
        drop(guard);
        assert_eq!(identity("/dev/fd/2"), original);
    }

    #[test]
    fn interrupt_kills_attached_child() {
        let watch = LoadWatch::new();
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();

        let _guard = watch.begin(&module(), false);
        watch.attach_child(child.id());
        assert_eq!(watch.active_child(), Some(child.id()));
        watch.interrupt();

        assert_eq!(child.wait().unwrap().signal(), Some(9));
    }

    #[test]
    fn interrupt_leaves_detached_child_running() {
        let watch = LoadWatch::new();
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();

        let _guard = watch.begin(&module(), false);
        watch.attach_child(child.id());
        watch.detach_child();
        watch.interrupt();

        assert!(child.try_wait().unwrap().is_none());
        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[test]
    fn attach_child_without_active_load_is_ignored() {
        let watch = LoadWatch::new();

        watch.attach_child(1);

        assert_eq!(watch.active_child(), None);
    }

    #[test]
    #[serial]
    fn guard_drop_clears_active_module() {
        let watch = LoadWatch::new();

        {
            let _guard = watch.begin(&module(), false);
            assert_eq!(watch.active_module(), Some(module()));
        }

        assert_eq!(watch.active_module(), None);
        assert_eq!(watch.interrupt(), None);
    }
}
