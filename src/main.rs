use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

mod bus;
mod chat;
mod config;
mod deepseek;
mod driver;
mod error;
mod handle;
mod interface;
mod manager;
mod resolver;
mod server;
mod session;

use config::Config;
use resolver::{completion::CompletionClient, info::InfoClient, ResponseResolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        // Not fatal, the environment may already be set
        info!("No .env file found or failed to load: {}", e);
    }

    // Initialize logging with default filter if RUST_LOG is not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Brenin Digital Human starting...");

    let config = Config::from_env().context("Invalid configuration")?;

    let bus = Arc::new(bus::EventBus::new());

    let completion = CompletionClient::new(&config.completion_url, config.completion_timeout)
        .context("Failed to build completion client")?;
    let info_client = InfoClient::new(&config.info_url, config.info_timeout)
        .context("Failed to build info client")?;
    let resolver = Arc::new(ResponseResolver::new(
        Arc::new(completion),
        Arc::new(info_client),
        config.persona(),
    ));

    let manager = Arc::new(manager::SessionManager::new(
        resolver,
        bus.clone(),
        config.attachment_policy(),
        driver::Timing::from(&config),
    ));

    let deepseek = match config.deepseek_api_key.clone() {
        Some(key) => Some(
            deepseek::DeepSeekClient::new(
                key,
                config.deepseek_url.clone(),
                config.deepseek_model.clone(),
                config.completion_timeout,
            )
            .context("Failed to build DeepSeek client")?,
        ),
        None => {
            warn!("DEEPSEEK_API_KEY not set, completions will use the local fallback");
            None
        }
    };

    let state = Arc::new(server::AppState {
        manager: manager.clone(),
        deepseek,
        persona: config.persona().to_string(),
    });
    let app = server::router(state);

    info!("Starting HTTP server on port {}", config.port);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    let terminal = if config.terminal {
        let driver = manager.create_session();
        Some(interface::terminal::TerminalInterface::new(
            bus.clone(),
            driver,
            manager.handles().clone(),
        ))
    } else {
        info!("Terminal chat disabled, serving HTTP only.");
        None
    };

    let terminal_handle = tokio::spawn(async move {
        match terminal {
            Some(terminal) => {
                if let Err(e) = terminal.run().await {
                    error!("Terminal chat stopped with error: {}", e);
                }
            }
            None => std::future::pending::<()>().await,
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        res = axum::serve(listener, app) => {
            if let Err(e) = res {
                error!("Server stopped with error: {}", e);
            }
        }
        _ = terminal_handle => {
            info!("Terminal chat closed, shutting down...");
        }
    }

    Ok(())
}
