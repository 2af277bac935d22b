mod common;

use std::collections::BTreeSet;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use ffmpeg_copilot_backend::credentials::MemoryCredentialStore;
use ffmpeg_copilot_backend::generator::completion::CompletionError;

use common::{send_json, test_app, test_app_with, ScriptedCompletionClient};

#[tokio::test]
async fn generate_returns_command_and_placeholder_hints() {
    let completion = ScriptedCompletionClient::replying(
        r#"{"exe":"ffmpeg","args":["-i","/clips/holiday.mp4","-t","10","/out/holiday.mp4"]}"#,
    );
    let app = test_app_with(
        "generate_ok",
        MemoryCredentialStore::with_value("gsk_test"),
        completion.clone(),
    );

    let response = send_json(
        app.router,
        Method::POST,
        "/api/generate",
        Body::from(
            json!({
                "prompt": "keep only the first 10 seconds",
                "file": "/clips/holiday.mp4"
            })
            .to_string(),
        ),
        StatusCode::OK,
    )
    .await;

    assert_eq!(response["ok"], json!(true));
    assert_eq!(response["exe"], json!("ffmpeg"));
    assert_eq!(response["args"][0], json!("-i"));
    assert_eq!(response["model"], json!("llama-3.3-70b-versatile"));
    let hint = response["output_path_hint"]
        .as_str()
        .expect("hint should be a string");
    assert!(hint.starts_with(app.output_dir.join("holiday").to_string_lossy().as_ref()));
    assert!(app.output_dir.is_dir(), "output directory should be created");

    let calls = completion.calls();
    assert_eq!(calls.len(), 1);
    let (api_key, request) = &calls[0];
    assert_eq!(api_key, "gsk_test");
    assert_eq!(request.model, "llama-3.3-70b-versatile");
    assert_eq!(request.response_format.kind, "json_object");
    assert_eq!(request.messages[0].role, "system");
    assert!(request.messages[1].content.contains("keep only the first 10 seconds"));
    assert!(request.messages[1].content.contains(hint));
}

#[tokio::test]
async fn generate_without_credential_fails_before_any_provider_call() {
    let completion = ScriptedCompletionClient::replying(r#"{"exe":"ffmpeg","args":[]}"#);
    let app = test_app_with(
        "generate_no_key",
        MemoryCredentialStore::new(),
        completion.clone(),
    );

    let response = send_json(
        app.router,
        Method::POST,
        "/api/generate",
        Body::from(json!({"prompt": "convert to gif", "files": ["/a.mp4"]}).to_string()),
        StatusCode::PRECONDITION_FAILED,
    )
    .await;

    assert_eq!(response["error"], json!("API key not set"));
    assert_eq!(response["error_kind"], json!("policy"));
    assert_eq!(response["error_code"], json!("credential_missing"));
    assert!(completion.calls().is_empty());
}

#[tokio::test]
async fn duplicate_basenames_get_distinct_placeholders() {
    let app = test_app_with(
        "generate_multi",
        MemoryCredentialStore::with_value("gsk_test"),
        ScriptedCompletionClient::replying(r#"{"exe":"ffmpeg","args":["-filter_complex","hstack"]}"#),
    );

    let response = send_json(
        app.router,
        Method::POST,
        "/api/generate",
        Body::from(
            json!({
                "prompt": "stack side by side",
                "files": ["/day1/clip.mp4", "/day2/clip.mp4", "C:\\day3\\clip.mp4"],
                "model": "mixtral-8x7b-32768"
            })
            .to_string(),
        ),
        StatusCode::OK,
    )
    .await;

    let hints: Vec<String> = response["output_path_hints"]
        .as_array()
        .expect("hints should be an array")
        .iter()
        .map(|v| v.as_str().expect("hint string").to_string())
        .collect();
    assert_eq!(hints.len(), 3);
    assert_eq!(hints.iter().collect::<BTreeSet<_>>().len(), 3);
    assert!(hints[0].ends_with("_1"));
    assert!(hints[2].ends_with("_3"));
    assert_eq!(response["output_path_hint"], json!(hints[0]));
    assert_eq!(response["model"], json!("mixtral-8x7b-32768"));
}

#[tokio::test]
async fn non_json_model_reply_is_malformed_response_with_raw_text() {
    let app = test_app_with(
        "generate_malformed",
        MemoryCredentialStore::with_value("gsk_test"),
        ScriptedCompletionClient::replying("Sure! Run ffmpeg -i in.mp4 out.gif"),
    );

    let response = send_json(
        app.router,
        Method::POST,
        "/api/generate",
        Body::from(json!({"prompt": "make a gif", "files": ["/in.mp4"]}).to_string()),
        StatusCode::BAD_GATEWAY,
    )
    .await;

    assert_eq!(response["error_kind"], json!("provider"));
    assert_eq!(response["error_code"], json!("malformed_response"));
    assert!(response["error"]
        .as_str()
        .expect("error string")
        .contains("Sure! Run ffmpeg -i in.mp4 out.gif"));
}

#[tokio::test]
async fn provider_errors_surface_message_verbatim() {
    let app = test_app_with(
        "generate_provider_error",
        MemoryCredentialStore::with_value("gsk_bad"),
        ScriptedCompletionClient::failing(CompletionError::Api {
            status: 401,
            message: String::from("Invalid API Key"),
        }),
    );

    let response = send_json(
        app.router,
        Method::POST,
        "/api/generate",
        Body::from(json!({"prompt": "make a gif", "files": ["/in.mp4"]}).to_string()),
        StatusCode::BAD_GATEWAY,
    )
    .await;

    assert_eq!(response["error"], json!("Invalid API Key"));
    assert_eq!(response["error_code"], json!("provider_error"));
}

#[tokio::test]
async fn generate_validates_prompt_and_files() {
    let app = test_app("generate_validation");

    let missing_files = send_json(
        app.router.clone(),
        Method::POST,
        "/api/generate",
        Body::from(json!({"prompt": "make a gif"}).to_string()),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(
        missing_files["error"],
        json!("At least one input file is required")
    );

    let blank_entry = send_json(
        app.router,
        Method::POST,
        "/api/generate",
        Body::from(json!({"prompt": "make a gif", "files": ["/a.mp4", " "]}).to_string()),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(blank_entry["error"], json!("Input file at index 1 is empty"));
    assert!(app.completion.calls().is_empty());
}
