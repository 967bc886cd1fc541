//! # Process Runner
//!
//! Runs external tools (bazel, genhtml, gh) while streaming their output live
//! and keeping a copy of it for later pattern extraction.
//!
//! Standard output and standard error are each drained by their own reader
//! thread, so a tool that floods one stream while staying silent on the other
//! can never stall on a full pipe buffer. Each line is echoed to the matching
//! console stream as soon as it arrives and appended to an in-memory buffer.
//! Readers hand their buffer back over a channel once the pipe closes; a
//! successful [`ProcessRunner::run`] has collected both buffers and the exit
//! status.
//!
//! If waiting on the child fails, or the optional timeout elapses, the child
//! is killed and reaped and the error is returned at once. The readers are
//! abandoned then: a grandchild still holding the pipes open cannot extend
//! the call past its timeout.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Minimum wait for the output readers after the child exited.
const READER_GRACE: Duration = Duration::from_millis(500);

type ReaderResult = io::Result<String>;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn echo(self, text: &str) {
        // echo failures must not stop the pipe from being drained
        match self {
            Stream::Stdout => {
                print!("{}", text);
                let _ = io::stdout().flush();
            }
            Stream::Stderr => {
                eprint!("{}", text);
                let _ = io::stderr().flush();
            }
        }
    }
}

/// Builder for a single external command invocation.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    echo: bool,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            echo: true,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Whether output lines are mirrored to the console while captured.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Kill the process if it has not exited after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// The invocation as a single space-separated line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command to completion, capturing both output streams.
    pub fn run(&self) -> Result<ProcessOutput> {
        debug!("Running command: {}", self.command_line());

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| self.failure(e.to_string()))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout, stderr) = match (stdout, stderr) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                reap(&mut child);
                return Err(self.failure("output pipes were not captured".to_string()));
            }
        };

        let started = Instant::now();
        let stdout_reader = spawn_reader(stdout, Stream::Stdout, self.echo);
        let stderr_reader = spawn_reader(stderr, Stream::Stderr, self.echo);

        let status = self.wait(&mut child)?;
        let stdout = self.collect(&stdout_reader, started)?;
        let stderr = self.collect(&stderr_reader, started)?;

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: exit_code(status),
        })
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let status = match self.timeout {
            None => child.wait().map_err(|e| self.failure(e.to_string())),
            Some(limit) => self.wait_with_deadline(child, limit),
        };
        if status.is_err() {
            reap(child);
        }
        status
    }

    fn wait_with_deadline(&self, child: &mut Child, limit: Duration) -> Result<ExitStatus> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| self.failure(e.to_string()))?
            {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                return Err(self.failure(format!("timed out after {:?}", limit)));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Take a reader's buffer, bounded by whatever is left of the timeout.
    fn collect(&self, reader: &Receiver<ReaderResult>, started: Instant) -> Result<String> {
        let received = match self.timeout {
            None => reader.recv().map_err(|_| self.reader_stopped()),
            Some(limit) => {
                let remaining = limit.saturating_sub(started.elapsed()).max(READER_GRACE);
                reader.recv_timeout(remaining).map_err(|e| match e {
                    RecvTimeoutError::Timeout => self.failure(format!(
                        "timed out after {:?} waiting for output to close",
                        limit
                    )),
                    RecvTimeoutError::Disconnected => self.reader_stopped(),
                })
            }
        }?;
        received.map_err(|e| self.failure(format!("failed reading output: {}", e)))
    }

    fn reader_stopped(&self) -> Error {
        self.failure("output reader stopped unexpectedly".to_string())
    }

    fn failure(&self, message: String) -> Error {
        Error::Process {
            command: self.command_line(),
            message,
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    stream: Stream,
    echo: bool,
) -> Receiver<ReaderResult> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        // the receiver is gone when the run already failed
        let _ = sender.send(drain(pipe, stream, echo));
    });
    receiver
}

fn drain<R: Read>(pipe: R, stream: Stream, echo: bool) -> io::Result<String> {
    let mut reader = BufReader::new(pipe);
    let mut captured = String::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        if echo {
            stream.echo(&text);
        }
        captured.push_str(&text);
    }
    Ok(captured)
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
