use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
}

impl ChatCompletionRequest {
    pub fn json_object(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("http client init failed: {0}")]
    ClientInit(String),
    #[error("{0}")]
    Transport(String),
    /// Provider-reported failure; the message is passed through untouched.
    #[error("{message}")]
    Api { status: u16, message: String },
    /// The reply body is kept so callers can show what actually came back.
    #[error("completion response could not be decoded: {message}")]
    Decode { message: String, body: String },
    #[error("completion response contained no message content")]
    EmptyContent,
}

/// One chat completion round trip, returning the first choice's message
/// content as text.
pub trait CompletionClient: Send + Sync + 'static {
    fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, CompletionError>;
}

pub type SharedCompletionClient = Arc<dyn CompletionClient>;

/// OpenAI-compatible `/chat/completions` client (Groq by default).
///
/// The blocking client is built per call so it is created and dropped on the
/// blocking worker thread that runs the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCompletionClient {
    base_url: String,
    timeout: Duration,
    env_proxy: bool,
}

impl HttpCompletionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            env_proxy: true,
        }
    }

    /// Ignores `HTTP_PROXY` and friends so loopback servers are reached directly.
    #[cfg(test)]
    fn without_env_proxy(mut self) -> Self {
        self.env_proxy = false;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl CompletionClient for HttpCompletionClient {
    fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, CompletionError> {
        let endpoint = self.endpoint();
        debug!(endpoint = %endpoint, model = %request.model, "sending chat completion request");
        let mut builder = Client::builder().timeout(self.timeout);
        if !self.env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| CompletionError::ClientInit(e.to_string()))?;
        let resp = client
            .post(endpoint.as_str())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: provider_error_message(status.as_u16(), body.as_str()),
            });
        }

        extract_message_content(body.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

pub fn extract_message_content(body: &str) -> Result<String, CompletionError> {
    let payload: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Decode {
            message: e.to_string(),
            body: body.to_string(),
        })?;
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(CompletionError::EmptyContent)
}

/// Prefers the provider's `error.message`, then the raw body, then the
/// status line.
pub fn provider_error_message(status: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    if let Some(message) = from_json.filter(|m| !m.trim().is_empty()) {
        return message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::sync::mpsc;
    use std::thread;

    use serde_json::json;

    use super::*;

    /// Answers exactly one request with a canned response and hands back the
    /// raw request text.
    fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (SocketAddr, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write response");
            let _ = tx.send(request);
        });
        (addr, rx)
    }

    fn read_request(stream: &mut impl Read) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).expect("read request");
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(raw.as_slice()).to_string();
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
        String::from_utf8_lossy(raw.as_slice()).to_string()
    }

    fn client_for(addr: SocketAddr) -> HttpCompletionClient {
        HttpCompletionClient::new(format!("http://{addr}/openai/v1"), Duration::from_secs(5))
            .without_env_proxy()
    }

    fn sample_request() -> ChatCompletionRequest {
        ChatCompletionRequest::json_object(
            "llama-3.3-70b-versatile",
            vec![ChatMessage::system("sys"), ChatMessage::user("to mp3")],
        )
    }

    #[test]
    fn request_serializes_with_json_object_format() {
        let request = ChatCompletionRequest::json_object(
            "llama-3.3-70b-versatile",
            vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
        );
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value,
            json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ],
                "response_format": {"type": "json_object"}
            })
        );
    }

    #[test]
    fn content_is_taken_from_first_choice() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "{\"exe\":\"ffmpeg\",\"args\":[]}"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        })
        .to_string();
        assert_eq!(
            extract_message_content(body.as_str()).expect("content"),
            "{\"exe\":\"ffmpeg\",\"args\":[]}"
        );
    }

    #[test]
    fn missing_choices_is_empty_content() {
        assert_eq!(
            extract_message_content(r#"{"choices":[]}"#),
            Err(CompletionError::EmptyContent)
        );
        assert!(matches!(
            extract_message_content("<html>"),
            Err(CompletionError::Decode { ref body, .. }) if body == "<html>"
        ));
    }

    #[test]
    fn provider_message_is_passed_through() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(provider_error_message(401, body), "Invalid API Key");
        assert_eq!(provider_error_message(502, "  bad gateway "), "bad gateway");
        assert_eq!(provider_error_message(500, ""), "HTTP 500");

        let err = CompletionError::Api {
            status: 401,
            message: String::from("Invalid API Key"),
        };
        assert_eq!(err.to_string(), "Invalid API Key");
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client =
            HttpCompletionClient::new("https://api.groq.com/openai/v1/", Duration::from_secs(5));
        assert_eq!(
            client.endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn complete_posts_bearer_json_and_returns_content() {
        let (addr, requests) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"exe\":\"ffmpeg\",\"args\":[]}"}}]}"#,
        );
        let content = client_for(addr)
            .complete("gsk_test", &sample_request())
            .expect("completion");
        assert_eq!(content, r#"{"exe":"ffmpeg","args":[]}"#);

        let request = requests.recv().expect("request captured");
        let lowered = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /openai/v1/chat/completions HTTP/1.1"));
        assert!(lowered.contains("authorization: bearer gsk_test"));
        assert!(lowered.contains("content-type: application/json"));
        assert!(request.contains(r#""response_format":{"type":"json_object"}"#));
        assert!(request.contains(r#""model":"llama-3.3-70b-versatile""#));
    }

    #[test]
    fn complete_maps_error_status_to_provider_message() {
        let (addr, _requests) = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#,
        );
        let err = client_for(addr)
            .complete("gsk_bad", &sample_request())
            .expect_err("should fail");
        assert_eq!(
            err,
            CompletionError::Api {
                status: 401,
                message: String::from("Invalid API Key"),
            }
        );
    }

    #[test]
    fn complete_keeps_undecodable_success_body() {
        let (addr, _requests) = serve_once("200 OK", "<html>502 Bad Gateway from proxy</html>");
        let err = client_for(addr)
            .complete("gsk_test", &sample_request())
            .expect_err("should fail");
        assert!(matches!(
            err,
            CompletionError::Decode { ref body, .. }
                if body == "<html>502 Bad Gateway from proxy</html>"
        ));
    }

    #[test]
    fn complete_reports_refused_connection_as_transport() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
            listener.local_addr().expect("local addr")
        };
        let err = client_for(addr)
            .complete("gsk_test", &sample_request())
            .expect_err("nothing is listening");
        assert!(matches!(err, CompletionError::Transport(_)), "{err:?}");
    }
}
