//! Compilation with a locally installed compiler binary.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use kiln_cache::ArtifactCache;

use super::{Dispatcher, RawOutput};
use crate::error::{DispatchError, InvocationFailure};
use crate::request::CompileRequest;

/// Exit status solc uses when it rejects the source.
const COMPILE_ERROR_STATUS: i32 = 1;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Distinguishes temporary source files written concurrently by one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Runs the compiler as a child process.
///
/// Sources are written to the request's scratch directory under their
/// include keys and the compiler runs with that directory as its working
/// directory, so it never sees the original paths.
#[derive(Debug, Clone)]
pub struct LocalDispatcher {
    binary: String,
    scratch: ArtifactCache,
    timeout: Duration,
}

impl LocalDispatcher {
    /// Creates a dispatcher running `binary`, materializing sources under
    /// the scratch directories of `scratch`.
    pub fn new(binary: impl Into<String>, scratch: ArtifactCache, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            scratch,
            timeout,
        }
    }

    /// The compiler executable.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Asks the compiler for its version string, e.g.
    /// `0.4.21+commit.dfe3193c.Linux.g++`.
    pub fn version(&self) -> Result<String, DispatchError> {
        let mut command = Command::new(&self.binary);
        command.arg("--version");
        let (status, text) = self.run(command)?;
        if !status.success() {
            return Err(DispatchError::invocation(
                &self.binary,
                InvocationFailure::Exit {
                    status: status.to_string(),
                    output: text,
                },
            ));
        }
        let version = text
            .lines()
            .find_map(|line| line.split_once("Version:").map(|(_, v)| v.trim()))
            .or_else(|| text.lines().map(str::trim).rfind(|l| !l.is_empty()))
            .unwrap_or_default();
        Ok(version.to_string())
    }

    /// Writes every include into `dir`. Files already present are left alone:
    /// their name is their content digest.
    ///
    /// Each writer uses its own temporary file, so concurrent sends of the
    /// same request only ever rename complete files into place.
    fn materialize(&self, request: &CompileRequest, dir: &Path) -> Result<(), DispatchError> {
        std::fs::create_dir_all(dir).map_err(|e| DispatchError::Materialize {
            path: dir.to_path_buf(),
            source: e,
        })?;
        for (key, file) in &request.includes {
            let path = dir.join(key);
            if path.is_file() {
                continue;
            }
            let tmp = dir.join(format!(
                ".{key}.{}.{}.tmp",
                std::process::id(),
                TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
            std::fs::write(&tmp, &file.script).map_err(|e| DispatchError::Materialize {
                path: tmp.clone(),
                source: e,
            })?;
            std::fs::rename(&tmp, &path).map_err(|e| DispatchError::Materialize {
                path: path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn command(&self, request: &CompileRequest, dir: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command.current_dir(dir).arg("--combined-json").arg("bin,abi");
        if request.optimize {
            command.arg("--optimize");
        }
        if let Some(libraries) = request.libraries_arg() {
            command.arg("--libraries").arg(libraries);
        }
        command.arg(&request.entry);
        command
    }

    /// Runs `command` to completion or until the timeout, returning its
    /// exit status and stderr followed by stdout.
    fn run(&self, mut command: Command) -> Result<(ExitStatus, String), DispatchError> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                let failure = if e.kind() == std::io::ErrorKind::NotFound {
                    InvocationFailure::NotFound
                } else {
                    InvocationFailure::Io(e)
                };
                DispatchError::invocation(&self.binary, failure)
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;

        let mut text = collect(stderr);
        text.push_str(&collect(stdout));
        Ok((status, text))
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, DispatchError> {
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if started.elapsed() >= self.timeout => {
                    // The child may have exited since try_wait; either way it is gone after wait.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(DispatchError::invocation(
                        &self.binary,
                        InvocationFailure::Timeout(self.timeout),
                    ));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(DispatchError::invocation(&self.binary, e)),
            }
        }
    }

    fn scratch_dir(&self, request: &CompileRequest) -> PathBuf {
        self.scratch.scratch_dir(&request.digest())
    }
}

impl Dispatcher for LocalDispatcher {
    fn send(&self, request: &CompileRequest) -> Result<RawOutput, DispatchError> {
        let dir = self.scratch_dir(request);
        self.materialize(request, &dir)?;

        tracing::debug!(binary = %self.binary, dir = %dir.display(), entry = %request.entry, "invoking compiler");
        let (status, text) = self.run(self.command(request, &dir))?;
        tracing::debug!(%status, bytes = text.len(), "compiler finished");

        match status.code() {
            Some(0) => Ok(RawOutput::success(text)),
            Some(COMPILE_ERROR_STATUS) if !text.trim().is_empty() => {
                Ok(RawOutput::compile_error(text))
            }
            _ => Err(DispatchError::invocation(
                &self.binary,
                InvocationFailure::Exit {
                    status: status.to_string(),
                    output: text,
                },
            )),
        }
    }

    fn describe(&self) -> String {
        format!("local compiler '{}'", self.binary)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            // A read error leaves whatever was captured so far.
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}
