//! Review bot entry point.
//!
//! Binary name: `reviewbot`
//!
//! Parses CLI arguments, initializes tracing, the database and the session
//! registry, then either long-polls Telegram, serves the webhook receiver or
//! manages the webhook registration.

mod cli;
mod http;
mod state;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use reviewbot_infra::telegram::{TelegramTransport, UpdatePoller};
use reviewbot_observe::tracing_setup::{default_filter, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, WebhookCommand};
use state::{AppState, bot_token, load_app_config};

/// Buffer between the update poller and the dispatcher.
const UPDATE_CHANNEL_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.otel, default_filter(cli.verbose, cli.quiet))
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (config, data_dir) = load_app_config(cli.config).await?;
    let transport = TelegramTransport::new(bot_token(cli.token)?, &config.telegram)?;

    match cli.command {
        Commands::Webhook { action } => {
            let result = match action {
                WebhookCommand::Set { url } => transport.set_webhook(&url).await?,
                WebhookCommand::Info => transport.webhook_info().await?,
                WebhookCommand::Delete => transport.delete_webhook().await?,
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Poll => {
            let state = AppState::init(config, data_dir, transport).await?;
            poll(state).await;
        }

        Commands::Serve { host, port } => {
            let state = AppState::init(config, data_dir, transport).await?;
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            serve(state, &host, port).await?;
        }
    }

    Ok(())
}

/// Long-poll until Ctrl+C or SIGTERM, then drain and stop every session.
async fn poll(state: AppState) {
    let registry = state.registry().clone();
    let reaper = registry.spawn_reaper();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);

    let dispatcher = state.dispatcher.clone();
    let dispatch_cancel = cancel.clone();
    let dispatch_task = tokio::spawn(async move { dispatcher.run(rx, dispatch_cancel).await });

    let poller = UpdatePoller::new(state.transport.clone(), state.config.telegram.poll_timeout_secs);
    let poll_task = tokio::spawn(poller.run(tx, cancel.clone()));

    tracing::info!("polling for updates, press Ctrl+C to stop");
    shutdown_signal().await;
    tracing::info!("shutting down");

    cancel.cancel();
    for task in [poll_task, dispatch_task] {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "background task failed");
        }
    }

    registry.shutdown().await;
    if let Err(e) = reaper.await {
        tracing::warn!(error = %e, "session reaper failed");
    }
}

/// Serve the webhook receiver until Ctrl+C or SIGTERM.
async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let registry = state.registry().clone();
    let reaper = registry.spawn_reaper();

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        path = http::router::WEBHOOK_PATH,
        "webhook receiver listening"
    );

    let router = http::router::build_router(state);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    registry.shutdown().await;
    if let Err(e) = reaper.await {
        tracing::warn!(error = %e, "session reaper failed");
    }
    served?;

    tracing::info!("server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
