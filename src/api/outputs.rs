use std::path::PathBuf;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::server::AppState;
use crate::inventory::{mime_for_path, read_as_data_uri, OutputFileRecord};

use super::handler_utils::{
    internal_error, into_json, map_inventory_error, validation_error, ApiObject,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataUriQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
struct ListOutputsResponse {
    ok: bool,
    output_dir: String,
    count: usize,
    files: Vec<OutputFileRecord>,
}

#[derive(Debug, Clone, Serialize)]
struct DataUriResponse {
    ok: bool,
    path: String,
    mime: &'static str,
    data_uri: String,
}

pub async fn list_outputs_handler(State(state): State<AppState>) -> ApiObject<Value> {
    let inventory = state.inventory.clone();
    let result = tokio::task::spawn_blocking(move || inventory.list()).await;

    match result {
        Ok(Ok(files)) => (
            StatusCode::OK,
            into_json(ListOutputsResponse {
                ok: true,
                output_dir: state.inventory.output_dir().display().to_string(),
                count: files.len(),
                files,
            }),
        ),
        Ok(Err(error)) => map_inventory_error(error),
        Err(join_error) => internal_error(format!("output listing task failed: {join_error}")),
    }
}

/// Relative paths resolve against the output directory.
pub async fn read_data_uri_handler(
    State(state): State<AppState>,
    Query(query): Query<DataUriQuery>,
) -> ApiObject<Value> {
    let raw = query.path.trim();
    if raw.is_empty() {
        return validation_error("Query parameter 'path' is required");
    }
    let requested = PathBuf::from(raw);
    let path = if requested.is_absolute() {
        requested
    } else {
        state.inventory.output_dir().join(requested)
    };

    let read_path = path.clone();
    let result = tokio::task::spawn_blocking(move || read_as_data_uri(read_path.as_path())).await;

    match result {
        Ok(Ok(data_uri)) => (
            StatusCode::OK,
            into_json(DataUriResponse {
                ok: true,
                mime: mime_for_path(path.as_path()),
                path: path.display().to_string(),
                data_uri,
            }),
        ),
        Ok(Err(error)) => map_inventory_error(error),
        Err(join_error) => internal_error(format!("data URI task failed: {join_error}")),
    }
}
