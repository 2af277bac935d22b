use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::api::server::AppState;

use super::handler_utils::{
    internal_error, into_json, json_body, map_credential_error, ApiObject,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetCredentialInput {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize)]
struct CredentialResponse {
    ok: bool,
    configured: bool,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct SetCredentialResponse {
    ok: bool,
    configured: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ClearCredentialResponse {
    ok: bool,
    deleted: bool,
}

pub async fn get_credential_handler(State(state): State<AppState>) -> ApiObject<Value> {
    let store = state.credentials.clone();
    let result = tokio::task::spawn_blocking(move || store.get()).await;

    match result {
        Ok(Ok(api_key)) => (
            StatusCode::OK,
            into_json(CredentialResponse {
                ok: true,
                configured: api_key.is_some(),
                api_key,
            }),
        ),
        Ok(Err(error)) => map_credential_error(error),
        Err(join_error) => internal_error(format!("credential read task failed: {join_error}")),
    }
}

pub async fn set_credential_handler(
    State(state): State<AppState>,
    payload: Result<Json<SetCredentialInput>, JsonRejection>,
) -> ApiObject<Value> {
    let payload = match json_body(payload) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };
    let store = state.credentials.clone();
    let result = tokio::task::spawn_blocking(move || store.set(payload.api_key.as_str())).await;

    match result {
        Ok(Ok(())) => {
            info!("provider API key stored");
            (
                StatusCode::OK,
                into_json(SetCredentialResponse {
                    ok: true,
                    configured: true,
                }),
            )
        }
        Ok(Err(error)) => map_credential_error(error),
        Err(join_error) => internal_error(format!("credential write task failed: {join_error}")),
    }
}

pub async fn clear_credential_handler(State(state): State<AppState>) -> ApiObject<Value> {
    let store = state.credentials.clone();
    let result = tokio::task::spawn_blocking(move || store.clear()).await;

    match result {
        Ok(Ok(deleted)) => {
            info!(deleted, "provider API key cleared");
            (
                StatusCode::OK,
                into_json(ClearCredentialResponse { ok: true, deleted }),
            )
        }
        Ok(Err(error)) => map_credential_error(error),
        Err(join_error) => internal_error(format!("credential clear task failed: {join_error}")),
    }
}
