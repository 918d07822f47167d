// Draft room server entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, terminal stays clean)
// 2. Load config
// 3. Open database
// 4. Load the player board
// 5. Build the broadcast bus, registry, and assignment manager
// 6. Run the WebSocket gateway until Ctrl+C

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use draftroom::board::PlayerBoard;
use draftroom::broadcast::ChannelBroadcast;
use draftroom::config;
use draftroom::rooms::{RoomAssignmentManager, RoomRegistry};
use draftroom::settle::LoggingSettlement;
use draftroom::store::Store;
use draftroom::ws_server::{self, Gateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, terminal stays clean)
    init_tracing()?;
    info!("draft room server starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "config loaded: {} seats, {} rounds, budget {}, {} contests",
        config.draft.seat_count,
        config.draft.rounds(),
        config.draft.budget,
        config.contests.len()
    );

    // 3. Open database
    let store = Arc::new(Store::open(&config.db_path).context("failed to open database")?);
    info!("database opened at {}", config.db_path);

    // 4. Load the player board
    let board = PlayerBoard::from_csv(std::path::Path::new(&config.board_path))
        .context("failed to load player board")?;
    info!("player board loaded: {} cells", board.len());

    // 5. Build the broadcast bus, registry, and assignment manager
    let broadcast = Arc::new(ChannelBroadcast::new());
    let registry = Arc::new(RoomRegistry::new());
    let manager = Arc::new(RoomAssignmentManager::new(
        Arc::new(config.draft.clone()),
        &config.contests,
        board,
        Arc::clone(&registry),
        Arc::clone(&store) as Arc<dyn draftroom::store::Persistence>,
        Arc::clone(&store) as Arc<dyn draftroom::store::BalanceLedger>,
        Arc::clone(&broadcast) as Arc<dyn draftroom::broadcast::Broadcast>,
        Arc::new(LoggingSettlement),
    ));
    let gateway = Arc::new(Gateway {
        manager,
        registry,
        broadcast,
    });

    // 6. Run the WebSocket gateway until Ctrl+C
    let port = config.port;
    let server = tokio::spawn(async move {
        if let Err(e) = ws_server::run(gateway, port).await {
            error!("gateway error: {e:#}");
        }
    });
    info!("server ready on 127.0.0.1:{port}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    server.abort();
    info!("draft room server shut down cleanly");
    Ok(())
}

/// Initialize tracing to a log file so the terminal stays usable for
/// operational output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftroom.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("draftroom=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
