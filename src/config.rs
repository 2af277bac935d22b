use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::generator::models::default_model_id;

pub const DEFAULT_BIND: &str = "127.0.0.1:8790";
pub const DEFAULT_API_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_KEYRING_SERVICE: &str = "ffmpeg_copilot";
pub const DEFAULT_KEYRING_ACCOUNT: &str = "groq_api_key";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const SETTINGS_REL_PATH: &str = "config/copilot.settings.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind: String,
    pub output_dir: PathBuf,
    pub api_base_url: String,
    pub default_model: String,
    pub request_timeout_secs: u64,
    pub keyring_service: String,
    pub keyring_account: String,
    /// Browser origins allowed to call the API. Empty means same-origin only.
    pub allowed_origins: Vec<String>,
}

/// Partial settings as read from the TOML file or the environment. Later
/// layers only override the fields they set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsOverlay {
    pub bind: Option<String>,
    pub output_dir: Option<String>,
    pub api_base_url: Option<String>,
    pub default_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub keyring_service: Option<String>,
    pub keyring_account: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read settings '{path}': {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse settings TOML '{path}': {message}")]
    ParseToml { path: String, message: String },
    #[error("settings field '{field}' is invalid: {message}")]
    InvalidValue { field: String, message: String },
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: String::from(DEFAULT_BIND),
            output_dir: default_output_dir(),
            api_base_url: String::from(DEFAULT_API_BASE_URL),
            default_model: String::from(default_model_id()),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            keyring_service: String::from(DEFAULT_KEYRING_SERVICE),
            keyring_account: String::from(DEFAULT_KEYRING_ACCOUNT),
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the settings file, then `FFMPEG_COPILOT_*` variables.
    pub fn load(app_root: &Path, explicit_settings_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overlay(load_settings_overlay(app_root, explicit_settings_path)?)?;
        config.apply_overlay(env_overlay(|key| std::env::var(key).ok())?)?;
        Ok(config)
    }

    pub fn apply_overlay(&mut self, overlay: SettingsOverlay) -> Result<(), ConfigError> {
        if let Some(bind) = non_empty(overlay.bind) {
            bind.parse::<std::net::SocketAddr>()
                .map_err(|e| invalid("bind", e.to_string()))?;
            self.bind = bind;
        }
        if let Some(output_dir) = non_empty(overlay.output_dir) {
            self.output_dir = PathBuf::from(output_dir);
        }
        if let Some(base_url) = non_empty(overlay.api_base_url) {
            let parsed = Url::parse(base_url.as_str())
                .map_err(|e| invalid("api_base_url", e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid("api_base_url", "scheme must be http or https"));
            }
            self.api_base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty(overlay.default_model) {
            self.default_model = model;
        }
        if let Some(timeout) = overlay.request_timeout_secs {
            if timeout == 0 {
                return Err(invalid("request_timeout_secs", "must be greater than zero"));
            }
            self.request_timeout_secs = timeout;
        }
        if let Some(service) = non_empty(overlay.keyring_service) {
            self.keyring_service = service;
        }
        if let Some(account) = non_empty(overlay.keyring_account) {
            self.keyring_account = account;
        }
        if let Some(origins) = overlay.allowed_origins {
            self.allowed_origins = origins
                .into_iter()
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }
        Ok(())
    }
}

pub fn load_settings_overlay(
    app_root: &Path,
    explicit_path: Option<&str>,
) -> Result<SettingsOverlay, ConfigError> {
    let explicit = explicit_path
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .map(|p| if p.is_absolute() { p } else { app_root.join(p) });

    match explicit {
        // An explicitly named file must exist.
        Some(path) => read_overlay(path.as_path()),
        None => {
            let path = app_root.join(SETTINGS_REL_PATH);
            if path.is_file() {
                read_overlay(path.as_path())
            } else {
                Ok(SettingsOverlay::default())
            }
        }
    }
}

fn read_overlay(path: &Path) -> Result<SettingsOverlay, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    toml::from_str::<SettingsOverlay>(raw.as_str()).map_err(|e| ConfigError::ParseToml {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Builds an overlay from `FFMPEG_COPILOT_*` variables read through `lookup`.
pub fn env_overlay(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SettingsOverlay, ConfigError> {
    let request_timeout_secs = match lookup("FFMPEG_COPILOT_REQUEST_TIMEOUT_SECS") {
        Some(raw) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|e| invalid("request_timeout_secs", e.to_string()))?,
        ),
        _ => None,
    };

    Ok(SettingsOverlay {
        bind: lookup("FFMPEG_COPILOT_BIND"),
        output_dir: lookup("FFMPEG_COPILOT_OUTPUT_DIR"),
        api_base_url: lookup("FFMPEG_COPILOT_API_BASE_URL"),
        default_model: lookup("FFMPEG_COPILOT_DEFAULT_MODEL"),
        request_timeout_secs,
        keyring_service: lookup("FFMPEG_COPILOT_KEYRING_SERVICE"),
        keyring_account: lookup("FFMPEG_COPILOT_KEYRING_ACCOUNT"),
        allowed_origins: lookup("FFMPEG_COPILOT_ALLOWED_ORIGINS")
            .map(|raw| raw.split(',').map(str::to_string).collect()),
    })
}

pub fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ffmpeg_copilot")
        .join("outputs")
}

pub fn default_app_root() -> PathBuf {
    std::env::var("FFMPEG_COPILOT_APP_ROOT")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}
