use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod app;
mod http;
mod hub;

/// Real-time relay between quiz buzzers and game displays.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Path to buzzline.toml (overrides BUZZLINE_CONFIG).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buzzline_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // load config: --config > BUZZLINE_CONFIG env > ~/.buzzline/buzzline.toml
    let config_path = args.config.or_else(|| std::env::var("BUZZLINE_CONFIG").ok());
    let config = buzzline_core::config::BuzzlineConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            buzzline_core::config::BuzzlineConfig::default()
        });

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!(
        capacity = config.hub.channel_capacity,
        write_timeout_ms = config.hub.write_timeout_ms,
        keepalive_secs = config.hub.keepalive_secs,
        "hub configured"
    );

    let state = Arc::new(app::AppState::new(config));
    let router = app::build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Buzzline gateway listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state.hub)))
        .await?;

    info!("gateway stopped");
    Ok(())
}

/// Resolves on ctrl-c. Open streams never end on their own, so they are
/// closed here or graceful shutdown would wait on them forever.
async fn shutdown_signal(hub: Arc<hub::registry::Hub>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("could not listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    let closed = hub.disconnect_all();
    info!(closed, "shutdown requested, event streams closed");
}
