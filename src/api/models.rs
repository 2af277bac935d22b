use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::api::server::AppState;
use crate::generator::models::{ModelOption, MODEL_OPTIONS};

use super::handler_utils::{into_json, ApiObject};

#[derive(Debug, Clone, Serialize)]
struct ListModelsResponse {
    ok: bool,
    default_model: String,
    count: usize,
    models: &'static [ModelOption],
}

pub async fn list_models_handler(State(state): State<AppState>) -> ApiObject<Value> {
    (
        StatusCode::OK,
        into_json(ListModelsResponse {
            ok: true,
            default_model: state.config.default_model.clone(),
            count: MODEL_OPTIONS.len(),
            models: MODEL_OPTIONS,
        }),
    )
}
