#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use ffmpeg_copilot_backend::api::server::{build_router_with_services, AppServices};
use ffmpeg_copilot_backend::config::AppConfig;
use ffmpeg_copilot_backend::credentials::MemoryCredentialStore;
use ffmpeg_copilot_backend::generator::completion::{
    ChatCompletionRequest, CompletionClient, CompletionError,
};
use ffmpeg_copilot_backend::shell::{DesktopShell, ShellError, WindowControls};

/// Replies with a fixed result and records every request it receives.
#[derive(Default)]
pub struct ScriptedCompletionClient {
    reply: Mutex<Option<Result<String, CompletionError>>>,
    calls: Mutex<Vec<(String, ChatCompletionRequest)>>,
}

impl ScriptedCompletionClient {
    pub fn replying(content: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(Ok(content.to_string()))),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: CompletionError) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(Err(error))),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, ChatCompletionRequest)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl CompletionClient for ScriptedCompletionClient {
    fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, CompletionError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((api_key.to_string(), request.clone()));
        self.reply
            .lock()
            .expect("reply lock")
            .clone()
            .unwrap_or(Err(CompletionError::EmptyContent))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    Reveal(PathBuf),
    OpenUrl(String),
}

#[derive(Default)]
pub struct RecordingShell {
    calls: Mutex<Vec<ShellCall>>,
}

impl RecordingShell {
    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().expect("shell lock").clone()
    }
}

impl DesktopShell for RecordingShell {
    fn reveal(&self, path: &Path) -> Result<(), ShellError> {
        if !path.exists() {
            return Err(ShellError::PathNotFound(path.to_path_buf()));
        }
        self.calls
            .lock()
            .expect("shell lock")
            .push(ShellCall::Reveal(path.to_path_buf()));
        Ok(())
    }

    fn open_url(&self, url: &Url) -> Result<(), ShellError> {
        self.calls
            .lock()
            .expect("shell lock")
            .push(ShellCall::OpenUrl(url.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub credentials: Arc<MemoryCredentialStore>,
    pub completion: Arc<ScriptedCompletionClient>,
    pub shell: Arc<RecordingShell>,
    pub window: WindowControls,
}

pub fn test_app(label: &str) -> TestApp {
    test_app_with(
        label,
        MemoryCredentialStore::new(),
        ScriptedCompletionClient::replying(r#"{"exe":"ffmpeg","args":["-version"]}"#),
    )
}

pub fn test_app_with(
    label: &str,
    credentials: MemoryCredentialStore,
    completion: Arc<ScriptedCompletionClient>,
) -> TestApp {
    let root = std::env::temp_dir().join(format!("ffmpeg_copilot_{label}_{}", Uuid::new_v4()));
    std::fs::create_dir_all(root.as_path()).expect("temp test root must be creatable");
    let output_dir = root.join("outputs");

    let config = AppConfig {
        output_dir: output_dir.clone(),
        ..AppConfig::default()
    };
    let credentials = Arc::new(credentials);
    let shell = Arc::new(RecordingShell::default());
    let window = WindowControls::new();
    let services = AppServices {
        credentials: credentials.clone(),
        completion: completion.clone(),
        shell: shell.clone(),
        window: window.clone(),
    };

    TestApp {
        router: build_router_with_services(config, services),
        root,
        output_dir,
        credentials,
        completion,
        shell,
        window,
    }
}

pub async fn send_json(
    app: axum::Router,
    method: Method,
    uri: &str,
    body: Body,
    expected_status: StatusCode,
) -> Value {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .expect("request should build");

    let response = app
        .oneshot(request)
        .await
        .expect("router should return response");
    assert_eq!(response.status(), expected_status);

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(body.as_ref()).expect("response should be valid JSON")
}

pub async fn send_raw(app: axum::Router, method: Method, uri: &str, body: Body) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .expect("request should build");

    let response = app
        .oneshot(request)
        .await
        .expect("router should return response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    (status, String::from_utf8_lossy(body.as_ref()).to_string())
}
