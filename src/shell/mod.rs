//! Desktop integration requested by the UI: revealing files, opening URLs and
//! window requests for the hosting shell.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("invalid URL '{value}': {message}")]
    InvalidUrl { value: String, message: String },
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("failed to run '{program}': {message}")]
    Launch { program: String, message: String },
}

pub trait DesktopShell: Send + Sync + 'static {
    fn reveal(&self, path: &Path) -> Result<(), ShellError>;
    fn open_url(&self, url: &Url) -> Result<(), ShellError>;
}

pub type SharedDesktopShell = Arc<dyn DesktopShell>;

/// Uses the platform opener: `explorer` on Windows, `open` on macOS and
/// `xdg-open` elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDesktopShell;

impl DesktopShell for SystemDesktopShell {
    fn reveal(&self, path: &Path) -> Result<(), ShellError> {
        if !path.exists() {
            return Err(ShellError::PathNotFound(path.to_path_buf()));
        }
        let (program, args) = reveal_command(path);
        run_opener(program, args)
    }

    fn open_url(&self, url: &Url) -> Result<(), ShellError> {
        let (program, args) = open_command(url.as_str());
        run_opener(program, args)
    }
}

#[cfg(target_os = "windows")]
fn reveal_command(path: &Path) -> (&'static str, Vec<String>) {
    if path.is_dir() {
        ("explorer", vec![path.display().to_string()])
    } else {
        ("explorer", vec![format!("/select,{}", path.display())])
    }
}

#[cfg(target_os = "macos")]
fn reveal_command(path: &Path) -> (&'static str, Vec<String>) {
    if path.is_dir() {
        ("open", vec![path.display().to_string()])
    } else {
        ("open", vec![String::from("-R"), path.display().to_string()])
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn reveal_command(path: &Path) -> (&'static str, Vec<String>) {
    let dir = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(path)
    };
    ("xdg-open", vec![dir.display().to_string()])
}

#[cfg(target_os = "windows")]
fn open_command(target: &str) -> (&'static str, Vec<String>) {
    ("explorer", vec![target.to_string()])
}

#[cfg(target_os = "macos")]
fn open_command(target: &str) -> (&'static str, Vec<String>) {
    ("open", vec![target.to_string()])
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn open_command(target: &str) -> (&'static str, Vec<String>) {
    ("xdg-open", vec![target.to_string()])
}

fn run_opener(program: &str, args: Vec<String>) -> Result<(), ShellError> {
    let status = Command::new(program)
        .args(args.iter().map(String::as_str))
        .status()
        .map_err(|e| ShellError::Launch {
            program: program.to_string(),
            message: e.to_string(),
        })?;
    // explorer.exe exits 1 even when it opened the window.
    if !status.success() && !cfg!(target_os = "windows") {
        return Err(ShellError::Launch {
            program: program.to_string(),
            message: format!("exited with {status}"),
        });
    }
    info!(program, "opened via desktop shell");
    Ok(())
}

/// Accepts http(s) and file URLs, or an absolute filesystem path which is
/// converted to a file URL.
pub fn parse_open_target(raw: &str) -> Result<Url, ShellError> {
    let trimmed = raw.trim();
    let invalid = |message: String| ShellError::InvalidUrl {
        value: trimmed.to_string(),
        message,
    };
    if trimmed.is_empty() {
        return Err(invalid(String::from("value is empty")));
    }

    let as_path = Path::new(trimmed);
    if as_path.is_absolute() {
        return Url::from_file_path(as_path)
            .map_err(|_| invalid(String::from("path cannot be expressed as a file URL")));
    }

    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" | "file" => Ok(url),
        other => Err(ShellError::UnsupportedScheme(other.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowRequest {
    Minimize,
    Close,
}

/// Latest window request, observed by the hosting shell and by the server's
/// shutdown hook.
#[derive(Debug, Clone)]
pub struct WindowControls {
    tx: Arc<watch::Sender<Option<WindowRequest>>>,
}

impl Default for WindowControls {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowControls {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn request(&self, request: WindowRequest) {
        info!(?request, "window request");
        self.tx.send_replace(Some(request));
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<WindowRequest>> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<WindowRequest> {
        *self.tx.borrow()
    }

    /// Resolves once a close has been requested.
    pub async fn closed(&self) {
        let mut rx = self.subscribe();
        // Sender lives in `self`, so `wait_for` can only fail if it is dropped.
        let _ = rx
            .wait_for(|request| matches!(request, Some(WindowRequest::Close)))
            .await;
    }
}
