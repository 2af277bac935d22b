use std::path::PathBuf;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::ErrorKind;
use crate::api::server::AppState;
use crate::generator::placeholder::ensure_output_dir;
use crate::shell::{parse_open_target, ShellError, WindowRequest};

use super::handler_utils::{
    error_response, internal_error, into_json, json_body, map_shell_error, ApiObject,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevealInput {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenUrlInput {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
struct RevealResponse {
    ok: bool,
    path: String,
}

#[derive(Debug, Clone, Serialize)]
struct OpenUrlResponse {
    ok: bool,
    url: String,
}

#[derive(Debug, Clone, Serialize)]
struct WindowResponse {
    ok: bool,
    request: WindowRequest,
}

enum RevealFailure {
    Shell(ShellError),
    OutputDir(std::io::Error),
}

/// Without a `path`, reveals the output directory, creating it first.
pub async fn reveal_handler(
    State(state): State<AppState>,
    payload: Result<Json<RevealInput>, JsonRejection>,
) -> ApiObject<Value> {
    let payload = match json_body(payload) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };
    let requested = payload
        .path
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let output_dir = state.inventory.output_dir().to_path_buf();
    let shell = state.shell.clone();

    let result = tokio::task::spawn_blocking(move || {
        let target = match requested {
            Some(path) => PathBuf::from(path),
            None => {
                ensure_output_dir(output_dir.as_path()).map_err(RevealFailure::OutputDir)?;
                output_dir
            }
        };
        shell
            .reveal(target.as_path())
            .map(|()| target)
            .map_err(RevealFailure::Shell)
    })
    .await;

    match result {
        Ok(Ok(path)) => (
            StatusCode::OK,
            into_json(RevealResponse {
                ok: true,
                path: path.display().to_string(),
            }),
        ),
        Ok(Err(RevealFailure::Shell(error))) => map_shell_error(error),
        Ok(Err(RevealFailure::OutputDir(error))) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Infra,
            "filesystem_error",
            format!("failed to create output directory: {error}"),
        ),
        Err(join_error) => internal_error(format!("reveal task failed: {join_error}")),
    }
}

pub async fn open_url_handler(
    State(state): State<AppState>,
    payload: Result<Json<OpenUrlInput>, JsonRejection>,
) -> ApiObject<Value> {
    let payload = match json_body(payload) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };
    let url = match parse_open_target(payload.url.as_str()) {
        Ok(url) => url,
        Err(error) => return map_shell_error(error),
    };
    let shell = state.shell.clone();
    let opened = url.clone();
    let result = tokio::task::spawn_blocking(move || shell.open_url(&opened)).await;

    match result {
        Ok(Ok(())) => (
            StatusCode::OK,
            into_json(OpenUrlResponse {
                ok: true,
                url: url.to_string(),
            }),
        ),
        Ok(Err(error)) => map_shell_error(error),
        Err(join_error) => internal_error(format!("open url task failed: {join_error}")),
    }
}

pub async fn minimize_window_handler(State(state): State<AppState>) -> ApiObject<Value> {
    window_request(&state, WindowRequest::Minimize)
}

/// The server drains in-flight requests and stops after answering this one.
pub async fn close_window_handler(State(state): State<AppState>) -> ApiObject<Value> {
    window_request(&state, WindowRequest::Close)
}

fn window_request(state: &AppState, request: WindowRequest) -> ApiObject<Value> {
    state.window.request(request);
    (
        StatusCode::OK,
        into_json(WindowResponse { ok: true, request }),
    )
}
