use ffmpeg_copilot_backend::api::server::serve;
use ffmpeg_copilot_backend::config::{default_app_root, AppConfig};
use ffmpeg_copilot_backend::credentials::{CredentialStore, KeychainCredentialStore};
use ffmpeg_copilot_backend::generator::models::is_known_model;
use ffmpeg_copilot_backend::inventory::OutputInventory;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut cli_args = std::env::args().skip(1).collect::<Vec<_>>();
    let command = match cli_args.first().map(String::as_str) {
        Some(name) if !name.starts_with('-') => cli_args.remove(0),
        _ => String::from("serve"),
    };

    match command.as_str() {
        "serve" => run_serve_cli(cli_args).await,
        "list-outputs" => run_list_outputs_cli(cli_args),
        "credential-status" => run_credential_status_cli(cli_args),
        "validate-config" => run_validate_config_cli(cli_args),
        unknown => Err(std::io::Error::other(format!(
            "Unknown command: {unknown}\n\nCommands: serve, list-outputs, credential-status, validate-config"
        ))
        .into()),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ConfigCliArgs {
    settings_path: Option<String>,
    help: bool,
}

fn parse_config_cli_args(args: &[String]) -> Result<ConfigCliArgs, Box<dyn std::error::Error>> {
    let mut parsed = ConfigCliArgs::default();
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let needs_value = |idx: usize| -> Result<String, Box<dyn std::error::Error>> {
            let Some(value) = args.get(idx + 1) else {
                return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
            };
            Ok(value.clone())
        };

        match flag {
            "-h" | "--help" => {
                parsed.help = true;
                i += 1;
            }
            "--settings" => {
                parsed.settings_path = Some(needs_value(i)?);
                i += 2;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }
    Ok(parsed)
}

fn load_config(parsed: &ConfigCliArgs) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let from_env = std::env::var("FFMPEG_COPILOT_SETTINGS").ok();
    let settings_path = parsed.settings_path.as_deref().or(from_env.as_deref());
    Ok(AppConfig::load(default_app_root().as_path(), settings_path)?)
}

async fn run_serve_cli(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_config_cli_args(args.as_slice())?;
    if parsed.help {
        print_serve_usage();
        return Ok(());
    }
    let config = load_config(&parsed)?;
    if !is_known_model(config.default_model.as_str()) {
        warn!(model = %config.default_model, "configured default model is not in the allow-list");
    }
    serve(config).await?;
    Ok(())
}

fn run_list_outputs_cli(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_config_cli_args(args.as_slice())?;
    if parsed.help {
        print_list_outputs_usage();
        return Ok(());
    }
    let config = load_config(&parsed)?;
    let inventory = OutputInventory::new(config.output_dir.clone());
    let files = inventory.list()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "ok": true,
            "output_dir": config.output_dir.display().to_string(),
            "count": files.len(),
            "files": files
        }))?
    );
    Ok(())
}

fn run_credential_status_cli(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_config_cli_args(args.as_slice())?;
    if parsed.help {
        print_credential_status_usage();
        return Ok(());
    }
    let config = load_config(&parsed)?;
    let store = KeychainCredentialStore::new(
        config.keyring_service.as_str(),
        config.keyring_account.as_str(),
    );
    let configured = store.get()?.is_some();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "ok": true,
            "service": store.service(),
            "account": store.account(),
            "configured": configured
        }))?
    );
    Ok(())
}

fn run_validate_config_cli(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_config_cli_args(args.as_slice())?;
    if parsed.help {
        print_validate_config_usage();
        return Ok(());
    }
    let config = load_config(&parsed)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "ok": true,
            "bind": config.bind,
            "output_dir": config.output_dir.display().to_string(),
            "api_base_url": config.api_base_url,
            "default_model": config.default_model,
            "default_model_known": is_known_model(config.default_model.as_str()),
            "request_timeout_secs": config.request_timeout_secs,
            "keyring_service": config.keyring_service,
            "keyring_account": config.keyring_account,
            "allowed_origins": config.allowed_origins
        }))?
    );
    Ok(())
}

fn print_serve_usage() {
    eprintln!(concat!(
        "Usage:\n",
        "  cargo run -- [serve] [--settings PATH]\n\n",
        "Defaults:\n",
        "  settings default: <app_root>/config/copilot.settings.toml when present\n",
        "  FFMPEG_COPILOT_* environment variables override file settings\n"
    ));
}

fn print_list_outputs_usage() {
    eprintln!(concat!(
        "Usage:\n",
        "  cargo run -- list-outputs [--settings PATH]\n"
    ));
}

fn print_credential_status_usage() {
    eprintln!(concat!(
        "Usage:\n",
        "  cargo run -- credential-status [--settings PATH]\n\n",
        "Reports whether an API key is stored; never prints the key.\n"
    ));
}

fn print_validate_config_usage() {
    eprintln!(concat!(
        "Usage:\n",
        "  cargo run -- validate-config [--settings PATH]\n"
    ));
}
