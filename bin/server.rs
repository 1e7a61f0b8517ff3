// Dispatch Tracker - Web Server
// JSON API over the local shipment store (axum)

use anyhow::{Context, Result};
use clap::Parser;
use dispatch_tracker::api::{router, ApiState};
use dispatch_tracker::{logging, AiGateway, AppConfig, ShipmentStore, SqliteStorage};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dispatch-server", version, about = "Dispatch Tracker HTTP API")]
struct Args {
    /// Config file (default: <config_dir>/dispatch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database file, overrides config and DISPATCH_DB
    #[arg(long)]
    db: Option<PathBuf>,

    /// Listen address, overrides config and DISPATCH_BIND
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.storage.path = db;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    println!("🌐 Dispatch Tracker - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let storage = SqliteStorage::open(&config.storage.path)
        .with_context(|| format!("Failed to open database {}", config.storage.path.display()))?;
    println!("✓ Database opened: {}", config.storage.path.display());

    let gateway = AiGateway::from_config(&config.ai);
    if gateway.is_configured() {
        println!("✓ AI features enabled ({})", config.ai.model);
    } else {
        println!("⚠️  AI features disabled (set GEMINI_API_KEY to enable)");
    }

    let app = router(ApiState::new(ShipmentStore::open(storage), gateway));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    println!("\n🚀 Server running on http://{}", config.server.bind);
    println!("   API: http://{}/api/shipments", config.server.bind);
    println!("\n   Press Ctrl+C to stop\n");
    tracing::info!(bind = %config.server.bind, "listening");

    axum::serve(listener, app)
        .await
        .context("Server terminated with an error")?;

    Ok(())
}
