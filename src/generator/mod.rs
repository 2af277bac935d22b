//! Natural-language request → structured external-tool invocation.

pub mod completion;
pub mod models;
pub mod placeholder;
pub mod prompt;

use std::io;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::credentials::{CredentialError, SharedCredentialStore};
use completion::{ChatCompletionRequest, ChatMessage, CompletionError, SharedCompletionClient};
use placeholder::{display_path, ensure_output_dir, placeholder_output_paths};
use prompt::{build_user_message, SYSTEM_INSTRUCTION};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    /// Single-file shorthand; merged in front of `files`.
    #[serde(default)]
    pub file: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: Option<String>, files: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model,
            files,
            file: None,
        }
    }

    pub fn input_files(&self) -> Vec<String> {
        self.file
            .iter()
            .chain(self.files.iter())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedCommand {
    #[serde(rename = "exe")]
    pub program: String,
    #[serde(rename = "args")]
    pub arguments: Vec<String>,
    pub output_path_hint: String,
    pub output_path_hints: Vec<String>,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0}")]
    Validation(String),
    #[error("API key not set")]
    CredentialMissing,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("failed to create output directory '{path}': {source}")]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("{0}")]
    Provider(String),
    #[error("{reason}: {raw}")]
    MalformedResponse { reason: String, raw: String },
}

impl From<CompletionError> for GenerateError {
    fn from(error: CompletionError) -> Self {
        match error {
            CompletionError::Decode { body, .. } => GenerateError::MalformedResponse {
                reason: String::from("Provider returned an unusable completion"),
                raw: body,
            },
            CompletionError::EmptyContent => GenerateError::MalformedResponse {
                reason: String::from("Provider returned an unusable completion"),
                raw: error.to_string(),
            },
            other => GenerateError::Provider(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommandPayload {
    exe: String,
    args: Vec<String>,
}

#[derive(Clone)]
pub struct CommandGenerator {
    credentials: SharedCredentialStore,
    client: SharedCompletionClient,
    output_dir: PathBuf,
    default_model: String,
}

impl CommandGenerator {
    pub fn new(
        credentials: SharedCredentialStore,
        client: SharedCompletionClient,
        output_dir: impl Into<PathBuf>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            client,
            output_dir: output_dir.into(),
            default_model: default_model.into(),
        }
    }

    /// Blocking: reads the keychain and performs one HTTP round trip.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GeneratedCommand, GenerateError> {
        self.generate_with_stamp(request, Utc::now().timestamp_millis())
    }

    pub fn generate_with_stamp(
        &self,
        request: &GenerationRequest,
        stamp_ms: i64,
    ) -> Result<GeneratedCommand, GenerateError> {
        let files = validate_request(request)?;
        let model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str())
            .to_string();
        if !models::is_known_model(model.as_str()) {
            warn!(model = %model, "model is not in the allow-list; passing through");
        }

        let api_key = self
            .credentials
            .get()?
            .filter(|key| !key.trim().is_empty())
            .ok_or(GenerateError::CredentialMissing)?;

        ensure_output_dir(self.output_dir.as_path()).map_err(|source| {
            GenerateError::OutputDir {
                path: self.output_dir.clone(),
                source,
            }
        })?;
        let placeholders = placeholder_output_paths(self.output_dir.as_path(), &files, stamp_ms);

        let completion_request = ChatCompletionRequest::json_object(
            model.clone(),
            vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(build_user_message(
                    request.prompt.as_str(),
                    &files,
                    &placeholders,
                )),
            ],
        );
        let content = self.client.complete(api_key.as_str(), &completion_request)?;
        let payload = parse_command_payload(content.as_str())?;

        let output_path_hints: Vec<String> =
            placeholders.iter().map(|p| display_path(p)).collect();
        info!(
            model = %model,
            input_count = files.len(),
            program = %payload.exe,
            arg_count = payload.args.len(),
            "generated command"
        );
        Ok(GeneratedCommand {
            program: payload.exe,
            arguments: payload.args,
            output_path_hint: output_path_hints[0].clone(),
            output_path_hints,
            model,
        })
    }
}

fn validate_request(request: &GenerationRequest) -> Result<Vec<String>, GenerateError> {
    if request.prompt.trim().is_empty() {
        return Err(GenerateError::Validation(String::from(
            "Field 'prompt' is required",
        )));
    }
    let files = request.input_files();
    if files.is_empty() {
        return Err(GenerateError::Validation(String::from(
            "At least one input file is required",
        )));
    }
    if let Some(idx) = files.iter().position(|f| f.trim().is_empty()) {
        return Err(GenerateError::Validation(format!(
            "Input file at index {idx} is empty"
        )));
    }
    Ok(files)
}

/// Parses the model's message content into `{exe, args}`, keeping the raw
/// text in every failure.
fn parse_command_payload(raw: &str) -> Result<CommandPayload, GenerateError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| GenerateError::MalformedResponse {
            reason: String::from("Model returned invalid JSON"),
            raw: raw.to_string(),
        })?;
    let payload: CommandPayload =
        serde_json::from_value(value).map_err(|e| GenerateError::MalformedResponse {
            reason: format!("Model JSON does not match {{exe, args}} ({e})"),
            raw: raw.to_string(),
        })?;
    if payload.exe.trim().is_empty() {
        return Err(GenerateError::MalformedResponse {
            reason: String::from("Model JSON has an empty 'exe'"),
            raw: raw.to_string(),
        });
    }
    Ok(payload)
}
