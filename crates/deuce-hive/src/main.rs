use anyhow::Context;
use clap::Parser;
use deuce_core::config::MatchFormat;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod auth;
mod coordinator;
mod db;
mod error;
mod registry;
mod routes;
mod state;
mod store;

use crate::coordinator::CoordinatorSettings;
use crate::state::AppState;
use crate::store::Store;

#[derive(Parser)]
#[command(name = "deuce-hive", about = "Live tennis scoring service")]
struct Args {
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// `memory` for a throwaway in-process store, otherwise a postgres:// URL
    #[arg(long, default_value = "memory")]
    db: String,

    /// Required in X-Deuce-Umpire for force-complete and cancel
    #[arg(long, env = "DEUCE_UMPIRE_SECRET")]
    umpire_secret: Option<String>,

    /// Commands buffered per match
    #[arg(long, default_value_t = 64)]
    queue_depth: usize,

    /// Updates a live subscriber may lag before frames are skipped
    #[arg(long, default_value_t = 128)]
    live_buffer: usize,

    /// Seconds an unwatched match may sit idle before its coordinator stops (0 = never)
    #[arg(long, default_value_t = 300)]
    idle_timeout_secs: u64,

    #[command(flatten)]
    format: MatchFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!("🎾 Deuce Hive is initializing...");
    args.format.validate().context("invalid default match format")?;

    let store = if args.db == "memory" {
        info!("🧠 Using in-memory store (nothing survives a restart)");
        Store::memory()
    } else {
        Store::postgres(db::init_db(&args.db).await.context("database setup failed")?)
    };

    if args.umpire_secret.is_none() {
        info!("🔓 No umpire secret set; umpire routes are open");
    }

    let settings = CoordinatorSettings {
        queue_depth: args.queue_depth,
        live_buffer: args.live_buffer,
        idle_timeout: (args.idle_timeout_secs > 0)
            .then(|| Duration::from_secs(args.idle_timeout_secs)),
    };
    let state = Arc::new(AppState::new(
        store,
        settings,
        args.umpire_secret,
        args.format,
    ));
    let app = routes::build_app(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("🚀 Hive listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.matches.shutdown().await;
    info!("👋 Hive stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown requested, draining matches...");
}
