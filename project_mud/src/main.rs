mod config;
mod shutdown;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use mud::{start_services, WorldRegistry};
use net::shutdown_channel;
use persistence::{load_areas, FileStore, MemoryStore, PlayerStore};
use player_db::PlayerDb;
use space::RoomAtlas;
use tokio::net::TcpListener;

use crate::config::{parse_cli_args, CliArgs, ServerConfig, StoreBackend};

#[tokio::main]
async fn main() {
    observability::init_logging();

    let cli = parse_cli_args();
    tracing::info!(static_dir = %cli.static_dir.display(), "MUD Server starting...");

    if let Err(e) = run(cli).await {
        tracing::error!("Server failed: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped.");
}

async fn run(cli: CliArgs) -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::load(&cli.config_path())?;

    let areas = load_areas(&cli.static_dir.join("areas"))?;
    let atlas = Arc::new(RoomAtlas::build(&areas)?);
    let registry = Arc::new(WorldRegistry::new(areas)?);
    tracing::info!(areas = ?registry.area_names(), "World loaded");

    let store = open_store(&config, &cli.static_dir)?;

    let addr = config.listen_addr(cli.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let services = start_services(registry, atlas, store, config.to_settings(), shutdown_rx);
    let mut server = tokio::spawn(mud::serve(listener, services.context.clone()));

    let finished = tokio::select! {
        signal = shutdown::wait_for_signal() => {
            if let Err(e) = signal {
                tracing::error!("signal handler failed: {}", e);
            }
            tracing::info!("Shutdown signal received, stopping server...");
            None
        }
        finished = &mut server => Some(finished),
    };

    tracing::info!(listeners = shutdown_tx.listeners(), "Stopping tasks");
    shutdown_tx.trigger();
    let finished = match finished {
        Some(finished) => finished,
        None => server.await,
    };
    services.join().await;
    finished??;
    Ok(())
}

fn open_store(config: &ServerConfig, static_dir: &Path) -> Result<Arc<dyn PlayerStore>, Box<dyn Error>> {
    let path = config.database.resolved_path(static_dir);
    let store: Arc<dyn PlayerStore> = match config.database.backend {
        StoreBackend::Toml => {
            let files = FileStore::new(path);
            tracing::info!(dir = %files.dir().display(), "Using TOML player files");
            Arc::new(files)
        }
        StoreBackend::Sqlite => Arc::new(PlayerDb::open(&path)?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory player store; nothing will be saved");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
