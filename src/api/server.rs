use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{delete, get, post, put, MethodRouter};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::routes::{route_catalog, RouteDefinition};
use crate::config::AppConfig;
use crate::contract::HttpMethod;
use crate::credentials::{KeychainCredentialStore, SharedCredentialStore};
use crate::executor::ProcessExecutor;
use crate::generator::completion::{HttpCompletionClient, SharedCompletionClient};
use crate::generator::CommandGenerator;
use crate::inventory::OutputInventory;
use crate::shell::{SharedDesktopShell, SystemDesktopShell, WindowControls};

/// Collaborators that touch the outside world; tests swap these for fakes.
#[derive(Clone)]
pub struct AppServices {
    pub credentials: SharedCredentialStore,
    pub completion: SharedCompletionClient,
    pub shell: SharedDesktopShell,
    pub window: WindowControls,
}

impl AppServices {
    pub fn system(config: &AppConfig) -> Self {
        Self {
            credentials: Arc::new(KeychainCredentialStore::new(
                config.keyring_service.as_str(),
                config.keyring_account.as_str(),
            )),
            completion: Arc::new(HttpCompletionClient::new(
                config.api_base_url.as_str(),
                Duration::from_secs(config.request_timeout_secs),
            )),
            shell: Arc::new(SystemDesktopShell),
            window: WindowControls::new(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service_name: &'static str,
    pub service_version: &'static str,
    pub started_unix_ms: u128,
    pub route_count: usize,
    pub config: Arc<AppConfig>,
    pub credentials: SharedCredentialStore,
    pub generator: Arc<CommandGenerator>,
    pub executor: Arc<ProcessExecutor>,
    pub inventory: Arc<OutputInventory>,
    pub shell: SharedDesktopShell,
    pub window: WindowControls,
}

impl AppState {
    pub fn new(route_count: usize, config: AppConfig, services: AppServices) -> Self {
        let generator = CommandGenerator::new(
            services.credentials.clone(),
            services.completion,
            config.output_dir.clone(),
            config.default_model.clone(),
        );
        Self {
            service_name: "ffmpeg-copilot-backend",
            service_version: env!("CARGO_PKG_VERSION"),
            started_unix_ms: now_unix_ms(),
            route_count,
            credentials: services.credentials,
            generator: Arc::new(generator),
            executor: Arc::new(ProcessExecutor::new().with_default_cwd(config.output_dir.clone())),
            inventory: Arc::new(OutputInventory::new(config.output_dir.clone())),
            shell: services.shell,
            window: services.window,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(config: AppConfig) -> Router {
    let services = AppServices::system(&config);
    build_router_with_services(config, services)
}

pub fn build_router_with_services(config: AppConfig, services: AppServices) -> Router {
    let catalog = route_catalog();
    let state = AppState::new(catalog.len(), config, services);
    build_router_with_catalog(catalog, state)
}

fn build_router_with_catalog(catalog: Vec<RouteDefinition>, state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(health_handler));

    for route in catalog {
        if route.spec.method == HttpMethod::Get && route.spec.path == "/health" {
            continue;
        }
        let Some(method_router) = method_router_for(&route) else {
            warn!(route = %route.spec, handler_id = %route.handler_id, "no handler attached to contract route");
            continue;
        };
        router = router.route(route.spec.path.as_str(), method_router);
    }

    let router = match cors_layer(state.config.allowed_origins.as_slice()) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Serves until the UI requests a window close.
pub async fn serve(config: AppConfig) -> std::io::Result<()> {
    let addr: SocketAddr = config
        .bind
        .parse()
        .map_err(|e| std::io::Error::other(format!("invalid bind address '{}': {e}", config.bind)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let services = AppServices::system(&config);
    let window = services.window.clone();
    info!(
        bind = %addr,
        output_dir = %config.output_dir.display(),
        api_base_url = %config.api_base_url,
        "starting ffmpeg-copilot-backend HTTP surface"
    );
    let app = build_router_with_services(config, services);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            window.closed().await;
            info!("window close requested; shutting down");
        })
        .await
}

fn method_router_for(route: &RouteDefinition) -> Option<MethodRouter<AppState>> {
    let method_router = match (route.spec.method, route.spec.path.as_str()) {
        (HttpMethod::Get, "/api/credential") => get(crate::api::credential::get_credential_handler),
        (HttpMethod::Put, "/api/credential") => put(crate::api::credential::set_credential_handler),
        (HttpMethod::Delete, "/api/credential") => {
            delete(crate::api::credential::clear_credential_handler)
        }
        (HttpMethod::Get, "/api/models") => get(crate::api::models::list_models_handler),
        (HttpMethod::Post, "/api/generate") => post(crate::api::generate::generate_handler),
        (HttpMethod::Post, "/api/execute") => post(crate::api::execute::execute_handler),
        (HttpMethod::Post, "/api/execute/stream") => {
            post(crate::api::execute::execute_stream_handler)
        }
        (HttpMethod::Get, "/api/outputs") => get(crate::api::outputs::list_outputs_handler),
        (HttpMethod::Get, "/api/outputs/data-uri") => {
            get(crate::api::outputs::read_data_uri_handler)
        }
        (HttpMethod::Post, "/api/shell/reveal") => post(crate::api::desktop::reveal_handler),
        (HttpMethod::Post, "/api/shell/open-url") => post(crate::api::desktop::open_url_handler),
        (HttpMethod::Post, "/api/window/minimize") => {
            post(crate::api::desktop::minimize_window_handler)
        }
        (HttpMethod::Post, "/api/window/close") => post(crate::api::desktop::close_window_handler),
        _ => return None,
    };
    Some(method_router)
}

fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.as_str()) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(origin = %origin, error = %error, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    )
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "status": "ok",
            "service": state.service_name,
            "version": state.service_version,
            "started_unix_ms": state.started_unix_ms,
            "route_count": state.route_count,
        })),
    )
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis())
}
