//! Shared test helpers: a recording command runner, output constructors and a
//! recording progress reporter.

#![allow(dead_code, clippy::unwrap_used)]

use std::io;
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};

use kindle_cli::application::ports::{CommandRunner, ProgressReporter};

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success, non-zero = failure).
///
/// On Unix the raw wait-status encodes the exit code in bits 8–15, so we shift.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Recording runner ─────────────────────────────────────────────────────────

/// One process invocation seen by [`MockCommandRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
}

impl Call {
    /// Arguments joined by single spaces, for substring assertions.
    pub fn line(&self) -> String {
        self.args.join(" ")
    }

    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len() && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

type Responder = dyn Fn(&Call) -> io::Result<Output> + Send + Sync;

/// `CommandRunner` that records every call and answers from a closure.
#[derive(Clone)]
pub struct MockCommandRunner {
    calls: Arc<Mutex<Vec<Call>>>,
    responder: Arc<Responder>,
}

impl MockCommandRunner {
    pub fn new(responder: impl Fn(&Call) -> io::Result<Output> + Send + Sync + 'static) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        }
    }

    /// Every call succeeds with empty output.
    pub fn succeeding() -> Self {
        Self::new(|_| Ok(ok_output(b"")))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &[&str]) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    fn record(&self, program: &str, args: &[&str], stdin: Option<&[u8]>) -> io::Result<Output> {
        let call = Call {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            stdin: stdin.map(<[u8]>::to_vec),
        };
        let response = (self.responder)(&call);
        self.calls.lock().unwrap().push(call);
        response
    }
}

impl CommandRunner for MockCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        self.record(program, args, None)
    }

    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
    ) -> io::Result<Output> {
        self.record(program, args, Some(input))
    }

    /// Records the call, then fails: the mock has no process to hand back.
    fn spawn(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> io::Result<tokio::process::Child> {
        self.record(program, args, input)?;
        Err(io::Error::other("spawn not supported by the mock runner"))
    }
}

// ── Recording reporter ───────────────────────────────────────────────────────

/// `ProgressReporter` that keeps every event as `"kind:message"`.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressReporter for RecordingReporter {
    fn start(&self, message: &str) {
        self.push(format!("start:{message}"));
    }

    fn end(&self, success: bool) {
        self.push(format!("end:{success}"));
    }

    fn step(&self, message: &str) {
        self.push(format!("step:{message}"));
    }

    fn success(&self, message: &str) {
        self.push(format!("success:{message}"));
    }

    fn warn(&self, message: &str) {
        self.push(format!("warn:{message}"));
    }
}
