use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::api::error::ErrorKind;
use crate::credentials::CredentialError;
use crate::generator::GenerateError;
use crate::inventory::InventoryError;
use crate::shell::ShellError;

pub type ApiObject<T> = (StatusCode, Json<T>);

#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
}

pub fn error_response(
    status: StatusCode,
    kind: ErrorKind,
    code: impl Into<String>,
    message: impl Into<String>,
) -> ApiObject<Value> {
    let code = code.into();
    debug!(status = status.as_u16(), kind = kind.as_str(), code = %code, "api error response");
    (
        status,
        into_json(ErrorResponse {
            ok: false,
            error: message.into(),
            error_kind: Some(kind),
            error_code: Some(code),
        }),
    )
}

pub fn validation_error(message: impl Into<String>) -> ApiObject<Value> {
    error_response(
        StatusCode::BAD_REQUEST,
        ErrorKind::Validation,
        "validation_error",
        message,
    )
}

/// Unwraps a JSON body, turning axum's plain-text rejection into the
/// validation envelope.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiObject<Value>> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| validation_error(rejection.body_text()))
}

pub fn map_credential_error(error: CredentialError) -> ApiObject<Value> {
    match error {
        CredentialError::EmptyValue => validation_error(error.to_string()),
        CredentialError::Backend(message) => {
            warn!(detail = %message, "credential store failure");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Infra,
                "credential_store_error",
                format!("credential store unavailable: {message}"),
            )
        }
    }
}

pub fn map_generate_error(error: GenerateError) -> ApiObject<Value> {
    match error {
        GenerateError::Validation(message) => validation_error(message),
        GenerateError::CredentialMissing => error_response(
            StatusCode::PRECONDITION_FAILED,
            ErrorKind::Policy,
            "credential_missing",
            error.to_string(),
        ),
        GenerateError::Credential(inner) => map_credential_error(inner),
        GenerateError::OutputDir { .. } => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Infra,
            "filesystem_error",
            error.to_string(),
        ),
        GenerateError::Provider(message) => error_response(
            StatusCode::BAD_GATEWAY,
            ErrorKind::Provider,
            "provider_error",
            message,
        ),
        GenerateError::MalformedResponse { .. } => error_response(
            StatusCode::BAD_GATEWAY,
            ErrorKind::Provider,
            "malformed_response",
            error.to_string(),
        ),
    }
}

pub fn map_inventory_error(error: InventoryError) -> ApiObject<Value> {
    match error {
        InventoryError::NotFound(_) => error_response(
            StatusCode::NOT_FOUND,
            ErrorKind::Validation,
            "not_found",
            error.to_string(),
        ),
        InventoryError::ReadDir { .. } | InventoryError::ReadFile { .. } => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Infra,
            "filesystem_error",
            error.to_string(),
        ),
    }
}

pub fn map_shell_error(error: ShellError) -> ApiObject<Value> {
    match error {
        ShellError::PathNotFound(_) => error_response(
            StatusCode::NOT_FOUND,
            ErrorKind::Validation,
            "not_found",
            error.to_string(),
        ),
        ShellError::InvalidUrl { .. } | ShellError::UnsupportedScheme(_) => {
            validation_error(error.to_string())
        }
        ShellError::Launch { .. } => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Infra,
            "shell_error",
            error.to_string(),
        ),
    }
}

pub fn internal_error(message: impl Into<String>) -> ApiObject<Value> {
    let detail = message.into();
    error!(detail = %detail, "internal api error");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Infra,
        "internal_error",
        "Internal server error",
    )
}

pub fn into_json(payload: impl Serialize) -> Json<Value> {
    Json(serde_json::to_value(payload).expect("api payload should serialize"))
}
