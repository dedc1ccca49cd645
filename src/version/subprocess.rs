//! Version resolution in an isolated worker process
//!
//! The worker performs the in-process load and reports the outcome as a
//! single protocol line (see [`crate::version::protocol`]). Whatever the module
//! does to its process (crashing, leaking, exiting early) stays in the worker.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error};

use crate::host::LoadWatch;
use crate::module::ModuleName;
use crate::version::error::StrategyError;
use crate::version::outcome::VersionOutcome;
use crate::version::protocol;
use crate::version::strategy::{StrategyKind, VersionStrategy};

/// Hidden flag that turns the binary into a worker for one module
pub const PROBE_FLAG: &str = "--probe";

/// Strategy that loads each module in a freshly spawned worker
pub struct SubprocessLoad {
    program: PathBuf,
    /// Leading arguments; the module name is appended after them
    args: Vec<OsString>,
    watch: LoadWatch,
}

impl SubprocessLoad {
    /// Worker running an arbitrary command with the module name appended
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>, watch: LoadWatch) -> Self {
        Self {
            program: program.into(),
            args,
            watch,
        }
    }

    /// Worker running this executable in probe mode with the given host settings
    pub fn probe(
        interpreter: &Path,
        includes: &[PathBuf],
        watch: LoadWatch,
    ) -> std::io::Result<Self> {
        let mut args: Vec<OsString> = vec!["--perl".into(), interpreter.into()];
        for dir in includes {
            args.push("--include".into());
            args.push(dir.into());
        }
        args.push(PROBE_FLAG.into());

        Ok(Self::new(std::env::current_exe()?, args, watch))
    }

    async fn run_worker(&self, name: &ModuleName) -> Result<VersionOutcome, StrategyError> {
        let worker_error = |source| StrategyError::Worker {
            module: name.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(name.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(worker_error)?;
        if let Some(pid) = child.id() {
            self.watch.attach_child(pid);
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| worker_error(std::io::Error::other("missing stdout")))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| worker_error(std::io::Error::other("missing stderr")))?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        reader.read_line(&mut line).await.map_err(worker_error)?;
        // Drain the pipe so the worker never blocks on a full buffer
        tokio::io::copy(&mut reader, &mut tokio::io::sink())
            .await
            .map_err(worker_error)?;

        let status = child.wait().await;
        self.watch.detach_child();
        let status = status.map_err(worker_error)?;
        let stderr_buf = stderr_task.await.unwrap_or_default();

        if !status.success() {
            debug!("Worker for {} exited with {}", name, status);
        }

        protocol::decode(&line).map_err(|source| {
            error!(
                "Worker for {} produced malformed output {:?} (exit {}, stderr: {})",
                name,
                line,
                status,
                String::from_utf8_lossy(&stderr_buf).trim()
            );
            StrategyError::Protocol {
                module: name.clone(),
                source,
            }
        })
    }
}

#[async_trait::async_trait]
impl VersionStrategy for SubprocessLoad {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Subprocess
    }

    async fn resolve(
        &self,
        name: &ModuleName,
        _file: Option<&Path>,
    ) -> Result<VersionOutcome, StrategyError> {
        let _guard = self.watch.begin(name, false);
        self.run_worker(name).await
    }
}
