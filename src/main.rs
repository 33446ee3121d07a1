mod auth;
mod config;
mod error;
mod logging;
mod models;
mod prompts;
mod provider_checks;
mod provider_client;
mod providers;
mod request_id;
mod router;

use clap::Parser;
use config::Config;
use notify::{EventKind, RecursiveMode, Watcher};
use provider_client::ProviderClient;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "storybook-router")]
#[command(about = "Turns a prompt into an illustrated, narrated short story")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    ip: String,

    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Path to config file; defaults apply when it does not exist
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bearer token required on /api/* routes
    #[arg(short, long)]
    token: Option<String>,

    /// trace, debug, info, warn, error
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Also write logs to this file (capped at 10 MiB)
    #[arg(long)]
    log_file: Option<String>,

    /// socks and http proxy, example: socks5://192.168.0.2:10080
    #[arg(long)]
    proxy: Option<String>,

    /// Probe every provider with the configured credentials and exit
    #[arg(long, default_value_t = false)]
    check: bool,
}

async fn watch_config_file(config_path: &str, shared: &Arc<RwLock<Config>>) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(100);

    let mut watcher = notify::recommended_watcher(move |res| {
        if let Ok(event) = res {
            if let Err(e) = tx.blocking_send(event) {
                eprintln!("Failed to send event: {}", e);
            }
        }
    })?;

    watcher.watch(Path::new(config_path), RecursiveMode::NonRecursive)?;

    while let Some(event) = rx.recv().await {
        if let EventKind::Modify(_) = event.kind {
            info!("Config file modified, attempting to reload");
            match config::reload_into(config_path, shared, |name| std::env::var(name).ok()).await {
                Ok(()) => info!("Configuration reloaded successfully"),
                Err(e) => error!("Failed to reload configuration, keeping previous one: {}", e),
            }
        }
    }

    Ok(())
}

fn build_http_client(proxy: Option<&str>) -> anyhow::Result<reqwest::Client> {
    let client_builder = reqwest::Client::builder();
    let client_builder = match proxy {
        Some(proxy) => client_builder.proxy(reqwest::Proxy::all(proxy)?),
        None => client_builder,
    };
    Ok(client_builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = Level::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using INFO level.", args.log_level);
        Level::INFO
    });
    logging::init_logging(log_level, args.log_file.as_deref());

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!("Failed to read .env: {}", e);
        }
    }

    let config_path = args.config.clone();
    let config = Config::load(&config_path)?;
    info!("Configuration loaded from: {}", config_path);

    let http_client = Arc::new(build_http_client(args.proxy.as_deref())?);
    if let Some(proxy) = &args.proxy {
        info!("Using proxy: {}", proxy);
    }
    let provider_client = ProviderClient::new(http_client);

    if args.check {
        let failures = provider_checks::perform_provider_checks(&config, &provider_client).await;
        if failures > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    let config = Arc::new(RwLock::new(config));

    let config_for_watcher = config.clone();
    tokio::spawn(async move {
        if let Err(e) = watch_config_file(&config_path, &config_for_watcher).await {
            warn!("Config file watcher error: {}", e);
        }
    });

    let app_state = auth::AppState {
        config,
        token: args.token,
        provider_client,
    };
    let app = router::app(app_state);

    let bind_address = format!("{}:{}", args.ip, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server started on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
