//! Child-process runner with incremental output delivery.
//!
//! `spawn` launches the program with an explicit argument list (never through
//! a shell) and returns an [`ExecutionHandle`] whose channel yields every
//! output chunk once, in the order it was appended to the combined output,
//! followed by exactly one [`ExecutionEvent::Finished`]. Chunks from stdout and
//! stderr are each ordered within their stream; their interleaving follows
//! arrival and is not otherwise guaranteed.

mod utf8;

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use utf8::drain_utf8;

const READ_BUF_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    #[serde(rename = "exe", alias = "program", default)]
    pub program: String,
    #[serde(rename = "args", alias = "arguments", default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub succeeded: bool,
    pub combined_output: String,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    /// False only when the program could not be started at all.
    pub launched: bool,
}

impl ExecutionOutcome {
    fn success(combined_output: String) -> Self {
        Self {
            succeeded: true,
            combined_output,
            exit_code: None,
            error_message: None,
            launched: true,
        }
    }

    fn nonzero_exit(code: i32, stderr_text: String, combined_output: String) -> Self {
        let error_message = if stderr_text.trim().is_empty() {
            format!("process exited with code {code}")
        } else {
            stderr_text
        };
        Self {
            succeeded: false,
            combined_output,
            exit_code: Some(code),
            error_message: Some(error_message),
            launched: true,
        }
    }

    fn failed(message: String, combined_output: String) -> Self {
        Self {
            succeeded: false,
            combined_output,
            exit_code: None,
            error_message: Some(message),
            launched: true,
        }
    }

    fn not_launched(message: String) -> Self {
        Self {
            launched: false,
            ..Self::failed(message, String::new())
        }
    }

    /// The process never ran, so there is no exit code.
    pub fn launch_failed(&self) -> bool {
        !self.launched
    }

    /// Stable machine-readable failure class; `None` on success.
    pub fn error_code(&self) -> Option<&'static str> {
        if self.succeeded {
            None
        } else if !self.launched {
            Some("launch_failed")
        } else if self.exit_code.is_some() {
            Some("nonzero_exit")
        } else {
            Some("terminated")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    Chunk(OutputChunk),
    Finished(ExecutionOutcome),
}

#[derive(Debug)]
pub struct ExecutionHandle {
    events: UnboundedReceiver<ExecutionEvent>,
}

impl ExecutionHandle {
    pub async fn next_event(&mut self) -> Option<ExecutionEvent> {
        self.events.recv().await
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<ExecutionEvent> {
        UnboundedReceiverStream::new(self.events)
    }

    /// Drains the remaining chunks and returns the final outcome.
    pub async fn wait(mut self) -> ExecutionOutcome {
        while let Some(event) = self.events.recv().await {
            if let ExecutionEvent::Finished(outcome) = event {
                return outcome;
            }
        }
        ExecutionOutcome::failed(
            String::from("process supervisor stopped without a result"),
            String::new(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessExecutor {
    default_cwd: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs commands from `dir` when the command names no directory and `dir`
    /// exists at launch time.
    pub fn with_default_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_cwd = Some(dir.into());
        self
    }

    /// Must be called from within a Tokio runtime.
    pub fn spawn(&self, spec: &CommandSpec) -> ExecutionHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut command = Command::new(spec.program.as_str());
        command
            .args(spec.args.iter().map(String::as_str))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let cwd = spec
            .cwd
            .clone()
            .or_else(|| self.default_cwd.clone().filter(|dir| dir.is_dir()));
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        match command.spawn() {
            Ok(child) => {
                info!(
                    program = %spec.program,
                    arg_count = spec.args.len(),
                    pid = child.id().unwrap_or_default(),
                    "spawned external command"
                );
                tokio::spawn(supervise(child, events_tx));
            }
            Err(error) => {
                warn!(program = %spec.program, error = %error, "failed to launch external command");
                let _ = events_tx.send(ExecutionEvent::Finished(ExecutionOutcome::not_launched(
                    format!("failed to launch '{}': {error}", spec.program),
                )));
            }
        }

        ExecutionHandle { events: events_rx }
    }

    pub async fn execute(&self, spec: &CommandSpec) -> ExecutionOutcome {
        self.spawn(spec).wait().await
    }
}

/// Single writer of the combined buffer: chunk order on the event channel is
/// the order text was appended.
async fn supervise(mut child: Child, events: UnboundedSender<ExecutionEvent>) {
    let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<OutputChunk>();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump(stdout, OutputStream::Stdout, chunk_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump(stderr, OutputStream::Stderr, chunk_tx.clone()));
    }
    drop(chunk_tx);

    let mut combined = String::new();
    let mut stderr_text = String::new();
    while let Some(chunk) = chunk_rx.recv().await {
        combined.push_str(chunk.text.as_str());
        if chunk.stream == OutputStream::Stderr {
            stderr_text.push_str(chunk.text.as_str());
        }
        // A dropped receiver only means nobody is listening any more.
        let _ = events.send(ExecutionEvent::Chunk(chunk));
    }

    let outcome = match child.wait().await {
        Ok(status) if status.success() => ExecutionOutcome::success(combined),
        Ok(status) => match status.code() {
            Some(code) => ExecutionOutcome::nonzero_exit(code, stderr_text, combined),
            None => ExecutionOutcome::failed(
                format!("process terminated without an exit code ({status})"),
                combined,
            ),
        },
        Err(error) => {
            ExecutionOutcome::failed(format!("failed to wait for process: {error}"), combined)
        }
    };
    info!(
        succeeded = outcome.succeeded,
        exit_code = ?outcome.exit_code,
        output_bytes = outcome.combined_output.len(),
        "external command finished"
    );
    let _ = events.send(ExecutionEvent::Finished(outcome));
}

async fn pump<R>(mut reader: R, stream: OutputStream, chunks: UnboundedSender<OutputChunk>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut pending = Vec::new();
    loop {
        match reader.read(buf.as_mut_slice()).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let text = drain_utf8(&mut pending);
                if !text.is_empty() && chunks.send(OutputChunk { stream, text }).is_err() {
                    return;
                }
            }
            Err(error) => {
                debug!(?stream, error = %error, "output pipe read failed");
                break;
            }
        }
    }
    if !pending.is_empty() {
        let text = String::from_utf8_lossy(pending.as_slice()).into_owned();
        let _ = chunks.send(OutputChunk { stream, text });
    }
}
