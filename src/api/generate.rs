use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::api::server::AppState;
use crate::generator::{GeneratedCommand, GenerationRequest};

use super::handler_utils::{
    internal_error, into_json, json_body, map_generate_error, ApiObject,
};

#[derive(Debug, Clone, Serialize)]
struct GenerateResponse {
    ok: bool,
    #[serde(flatten)]
    command: GeneratedCommand,
}

pub async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> ApiObject<Value> {
    let payload = match json_body(payload) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };
    let generator = state.generator.clone();
    let result = tokio::task::spawn_blocking(move || generator.generate(&payload)).await;

    match result {
        Ok(Ok(command)) => (
            StatusCode::OK,
            into_json(GenerateResponse { ok: true, command }),
        ),
        Ok(Err(error)) => map_generate_error(error),
        Err(join_error) => internal_error(format!("command generation task failed: {join_error}")),
    }
}
