//! Subprocess execution with captured output and an optional deadline.
//!
//! Every process the resolution engine launches goes through a
//! [`CommandRunner`]. [`SystemRunner`] is the real implementation; tests swap
//! in recording runners to assert which commands would have been run.

use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A fully described process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(OsString, OsString)>,
    pub timeout: Option<Duration>,
}

impl CommandRequest {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
            timeout: None,
        }
    }

    /// Program and arguments joined with spaces, for logs and error messages.
    pub fn display(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stderr followed by stdout, both trimmed; the shape install logs use.
    pub fn combined(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        match (stderr.is_empty(), stdout.is_empty()) {
            (true, _) => stdout.to_string(),
            (false, true) => stderr.to_string(),
            (false, false) => format!("{stderr}\n{stdout}"),
        }
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput>;
}

/// Runs requests as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
        let cmd = request.display();
        if let Some(cwd) = &request.cwd {
            if !cwd.is_dir() {
                return Err(Error::InvalidCwd(cwd.clone()));
            }
        }

        let mut inner = StdCommand::new(&request.program);
        inner
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &request.cwd {
            inner.current_dir(cwd);
        }
        for (key, val) in &request.envs {
            inner.env(key, val);
        }

        tracing::debug!(%cmd, timeout = ?request.timeout, "spawning process");
        let deadline = request.timeout.map(|timeout| Instant::now() + timeout);
        let mut child = inner.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound { cmd: cmd.clone() }
            } else {
                Error::CommandFailed {
                    cmd: cmd.clone(),
                    source,
                }
            }
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match (request.timeout, deadline) {
            (Some(timeout), Some(deadline)) => wait_with_deadline(&mut child, deadline, timeout, &cmd)?,
            _ => child.wait().map_err(|source| Error::CommandFailed {
                cmd: cmd.clone(),
                source,
            })?,
        };

        Ok(CommandOutput {
            code: status.code(),
            stdout: stdout.map(|d| d.collect(deadline, &cmd)).unwrap_or_default(),
            stderr: stderr.map(|d| d.collect(deadline, &cmd)).unwrap_or_default(),
        })
    }
}

/// A pipe being read on its own thread. Background processes spawned by
/// the child can keep the pipe open after the child itself exits.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Drain {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let (tx, done) = mpsc::channel();
    let sink = Arc::clone(&buf);
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = tx.send(());
    });
    Drain { buf, done }
}

impl Drain {
    /// Waits for EOF, but no later than `deadline`; then keeps what was read.
    fn collect(self, deadline: Option<Instant>, cmd: &str) -> String {
        let finished = match deadline {
            Some(deadline) => self
                .done
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .is_ok(),
            None => self.done.recv().is_ok(),
        };
        if !finished {
            tracing::debug!(%cmd, "output pipe still open at deadline, keeping partial output");
        }
        let bytes = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn wait_with_deadline(child: &mut Child, deadline: Instant, timeout: Duration, cmd: &str) -> Result<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                let now = Instant::now();
                if now >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Timeout {
                        cmd: cmd.to_string(),
                        timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL.min(deadline - now));
            }
            Err(source) => {
                return Err(Error::CommandFailed {
                    cmd: cmd.to_string(),
                    source,
                });
            }
        }
    }
}

/// Builder over [`CommandRequest`] that runs through [`SystemRunner`].
#[derive(Debug, Clone)]
pub struct Command {
    request: CommandRequest,
}

impl Command {
    /// `program` is a bare name looked up on `$PATH` or a path to run as is.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            request: CommandRequest::new(program.as_ref()),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.request.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.request
            .args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.request
            .envs
            .push((key.as_ref().to_os_string(), val.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.request.cwd = Some(dir.into());
        self
    }

    pub fn current_dir_opt(mut self, dir: Option<&Path>) -> Self {
        self.request.cwd = dir.map(Path::to_path_buf);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    pub fn request(&self) -> &CommandRequest {
        &self.request
    }

    pub fn output(&self) -> Result<CommandOutput> {
        SystemRunner.run(&self.request)
    }

    pub fn output_with(&self, runner: &dyn CommandRunner) -> Result<CommandOutput> {
        runner.run(&self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_new() {
        let cmd = Command::new("echo");
        assert_eq!(cmd.request().program, PathBuf::from("echo"));
    }

    #[test]
    fn test_command_args() {
        let cmd = Command::new("echo").arg("hello").args(["a", "b"]);
        assert_eq!(cmd.request().args.len(), 3);
    }

    #[test]
    fn test_command_arg_empty() {
        let cmd = Command::new("echo").arg("");
        assert_eq!(cmd.request().args, vec![OsString::new()]);
    }

    #[test]
    fn test_command_env_and_timeout() {
        let cmd = Command::new("echo")
            .env("KEY", "value")
            .timeout(Duration::from_secs(3));
        assert_eq!(cmd.request().envs.len(), 1);
        assert_eq!(cmd.request().timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_request_display() {
        let req = Command::new("pip").args(["install", "yt-dlp"]);
        assert_eq!(req.request().display(), "pip install yt-dlp");
    }

    #[test]
    fn test_output_combined() {
        let out = CommandOutput {
            code: Some(0),
            stdout: "done\n".into(),
            stderr: " warn ".into(),
        };
        assert!(out.success());
        assert_eq!(out.combined(), "warn\ndone");

        let quiet = CommandOutput {
            code: Some(1),
            ..Default::default()
        };
        assert!(!quiet.success());
        assert_eq!(quiet.combined(), "");
    }

    #[test]
    fn test_missing_program() {
        let result = Command::new("binprov_surely_missing_program_987").output();
        assert!(matches!(result, Err(Error::CommandNotFound { .. })));
    }

    #[test]
    fn test_invalid_cwd() {
        let result = Command::new("echo")
            .current_dir("/nonexistent/binprov/cwd")
            .output();
        assert!(matches!(result, Err(Error::InvalidCwd(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_output_captures_stdout_and_code() {
        let out = Command::new("sh")
            .args(["-c", "echo hello; echo oops >&2; exit 3"])
            .timeout(Duration::from_secs(10))
            .output()
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn test_output_times_out() {
        let start = Instant::now();
        let result = Command::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(100))
            .output();
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_output_does_not_wait_on_background_children() {
        let start = Instant::now();
        let out = Command::new("sh")
            .args(["-c", "sleep 3 & echo hi"])
            .timeout(Duration::from_millis(300))
            .output()
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(out.code, Some(0));
        assert_eq!(out.stdout.trim(), "hi");
    }
}
