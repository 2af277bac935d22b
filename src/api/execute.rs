use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tokio_stream::{Stream, StreamExt};

use crate::api::server::AppState;
use crate::executor::{CommandSpec, ExecutionEvent, ExecutionOutcome};

use super::handler_utils::{into_json, json_body, validation_error, ApiObject};

#[derive(Debug, Clone, Serialize)]
struct ExecuteResponse<'a> {
    ok: bool,
    #[serde(flatten)]
    outcome: &'a ExecutionOutcome,
    error_code: Option<&'static str>,
}

impl<'a> ExecuteResponse<'a> {
    fn new(outcome: &'a ExecutionOutcome) -> Self {
        Self {
            ok: true,
            error_code: outcome.error_code(),
            outcome,
        }
    }
}

fn validate_spec(spec: &CommandSpec) -> Result<(), ApiObject<Value>> {
    if spec.program.trim().is_empty() {
        return Err(validation_error("Field 'exe' is required"));
    }
    Ok(())
}

/// Runs to completion and returns the outcome. Launch failures and non-zero
/// exits are reported in the body, not as HTTP errors.
pub async fn execute_handler(
    State(state): State<AppState>,
    spec: Result<Json<CommandSpec>, JsonRejection>,
) -> ApiObject<Value> {
    let spec = match json_body(spec) {
        Ok(spec) => spec,
        Err(rejection) => return rejection,
    };
    if let Err(rejection) = validate_spec(&spec) {
        return rejection;
    }
    let outcome = state.executor.execute(&spec).await;
    (StatusCode::OK, into_json(ExecuteResponse::new(&outcome)))
}

/// Streams `chunk` events as output arrives, then one `finished` event.
pub async fn execute_stream_handler(
    State(state): State<AppState>,
    spec: Result<Json<CommandSpec>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiObject<Value>> {
    let spec = json_body(spec)?;
    validate_spec(&spec)?;
    let events = state
        .executor
        .spawn(&spec)
        .into_stream()
        .map(|event| match event {
            ExecutionEvent::Chunk(chunk) => Event::default().event("chunk").json_data(&chunk),
            ExecutionEvent::Finished(outcome) => Event::default()
                .event("finished")
                .json_data(ExecuteResponse::new(&outcome)),
        });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
