//! External scorer process driven over a line protocol.
//!
//! # Invocation
//!
//! The configured command (default `java -jar negsel2.jar`) is extended with
//! the session parameters, in this exact order:
//!
//! ```text
//! <command...> -self <training_artifact> -n <n> -r <r> -c -l
//! ```
//!
//! # Wire format
//!
//! ```text
//! stdin  ──► "efg_\n"            one token per request, flushed immediately
//! stdout ◄── "3.4657359\n"       exactly one decimal score per request
//! ```
//!
//! # Process lifecycle
//!
//! 1. `open` spawns the process with piped stdio.
//! 2. A reader thread forwards stdout lines over a channel, so every read
//!    can be bounded by the session timeout.
//! 3. A second thread drains stderr into the debug log.
//! 4. `close` (or drop) kills and reaps the process. Only the direct child
//!    is killed: a wrapper script must `exec` the real scorer, or the
//!    scorer outlives its session.
//!
//! # Error mapping
//!
//! - Executable missing: `ProcessSpawn`
//! - Process exits with a failure status before its first answer: `ProcessSpawn`
//! - Non-numeric or non-finite response, or no response within the timeout: `Protocol`
//! - Token containing `\n` or `\r`: `Protocol`, nothing is sent
//! - EOF, broken pipe, or exited process: `StreamClosed`

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{Result, SweepError};

use super::{Scorer, ScoringSession, SessionParams};

/// Default bound on a single response read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for an exit status after the output stream closed.
const EXIT_GRACE: Duration = Duration::from_millis(200);

/// Spawns one scorer process per session.
#[derive(Debug, Clone)]
pub struct ProcessScorer {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
}

impl ProcessScorer {
    /// Scorer from a full command line, e.g. `["java", "-jar", "negsel2.jar"]`.
    pub fn new(command: Vec<String>) -> Result<Self> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| SweepError::Config("scorer command is empty".into()))?;

        Ok(Self {
            program,
            base_args: parts.collect(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// `java -jar <jar>`.
    pub fn negsel_jar(jar: &str) -> Self {
        Self {
            program: "java".into(),
            base_args: vec!["-jar".into(), jar.into()],
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments appended for a session.
    pub fn session_args(params: &SessionParams) -> Vec<String> {
        vec![
            "-self".into(),
            params.training_artifact.display().to_string(),
            "-n".into(),
            params.n.to_string(),
            "-r".into(),
            params.r.to_string(),
            "-c".into(),
            "-l".into(),
        ]
    }

    /// Full command line for a session, program first.
    pub fn command_line(&self, params: &SessionParams) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.base_args.iter().cloned())
            .chain(Self::session_args(params))
            .collect()
    }
}

impl Scorer for ProcessScorer {
    type Session = ProcessSession;

    fn open(&self, params: &SessionParams) -> Result<ProcessSession> {
        debug!(command = ?self.command_line(params), "spawning scorer");

        let spawn_error = |reason: String| SweepError::ProcessSpawn {
            program: self.program.clone(),
            reason,
        };

        let mut child = Command::new(&self.program)
            .args(&self.base_args)
            .args(Self::session_args(params))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_error("failed to capture scorer stdio".into()));
        };

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("scorer-stdout".into())
            .spawn(move || {
                let mut reader = BufReader::new(stdout);
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            if tx.send(Ok(line)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            })
            .map_err(|e| spawn_error(format!("failed to start reader thread: {e}")))?;

        if let Some(stderr) = stderr {
            let program = self.program.clone();
            let _ = thread::Builder::new()
                .name("scorer-stderr".into())
                .spawn(move || {
                    for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                        debug!(%program, "scorer stderr: {line}");
                    }
                });
        }

        Ok(ProcessSession {
            program: self.program.clone(),
            params: params.clone(),
            child: Some(child),
            stdin: Some(stdin),
            responses: rx,
            timeout: self.timeout,
            answered: 0,
        })
    }
}

/// One live scorer process.
pub struct ProcessSession {
    program: String,
    params: SessionParams,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    responses: Receiver<std::io::Result<String>>,
    timeout: Duration,
    answered: usize,
}

impl ProcessSession {
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Responses received so far.
    pub fn answered(&self) -> usize {
        self.answered
    }

    pub fn is_closed(&self) -> bool {
        self.child.is_none()
    }

    fn exit_status(&mut self, grace: Duration) -> Option<ExitStatus> {
        let child = self.child.as_mut()?;
        let deadline = Instant::now() + grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                _ => return None,
            }
        }
    }

    /// Classify a vanished process. A failing exit before any answer means
    /// the scorer never started properly.
    fn closed_error(&mut self, context: &str) -> SweepError {
        let status = self.exit_status(EXIT_GRACE);
        match status {
            Some(status) if self.answered == 0 && !status.success() => SweepError::ProcessSpawn {
                program: self.program.clone(),
                reason: format!("exited with {status} before answering"),
            },
            Some(status) => SweepError::StreamClosed(format!("{context}; scorer exited with {status}")),
            None => SweepError::StreamClosed(context.to_string()),
        }
    }
}

impl ScoringSession for ProcessSession {
    fn score_one(&mut self, token: &str) -> Result<f64> {
        // A reader splitting on either byte would answer twice for one request.
        if token.contains(['\n', '\r']) {
            return Err(SweepError::Protocol(format!(
                "token {token:?} contains a line break"
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SweepError::StreamClosed("session already closed".into()));
        };

        let written = stdin
            .write_all(token.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush());
        if let Err(e) = written {
            let context = match e.kind() {
                ErrorKind::BrokenPipe => "scorer stopped reading its input".to_string(),
                _ => format!("write failed: {e}"),
            };
            return Err(self.closed_error(&context));
        }

        match self.responses.recv_timeout(self.timeout) {
            Ok(Ok(line)) => {
                let trimmed = line.trim();
                let score = trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|score| score.is_finite())
                    .ok_or_else(|| {
                        SweepError::Protocol(format!(
                            "expected a finite score for token {token:?}, got {trimmed:?}"
                        ))
                    })?;
                self.answered += 1;
                trace!(token, score, "scored");
                Ok(score)
            }
            Ok(Err(e)) => Err(SweepError::StreamClosed(format!("read failed: {e}"))),
            Err(RecvTimeoutError::Timeout) => Err(SweepError::Protocol(format!(
                "no response for token {token:?} within {:?}",
                self.timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(self.closed_error("scorer closed its output stream"))
            }
        }
    }

    fn close(&mut self) {
        // Closing stdin first lets a well-behaved scorer see EOF.
        self.stdin.take();

        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!(
                program = %self.program,
                n = self.params.n,
                r = self.params.r,
                answered = self.answered,
                "scorer closed"
            );
        }
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        self.close();
    }
}
