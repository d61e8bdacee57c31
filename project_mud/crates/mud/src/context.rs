use std::sync::Arc;

use net::ShutdownRx;
use persistence::{PlayerStore, StartLocation};
use space::RoomAtlas;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::handshake::{run_handshake_service, HandshakeClient, HandshakeService};
use crate::registry::WorldRegistry;
use crate::world::{run_world_loop, Event, World};
use crate::worker;

/// Runtime knobs shared by every task.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where new characters are placed.
    pub start: StartLocation,
    /// Failed login attempts allowed per connection.
    pub max_attempts: u32,
    pub handshake_capacity: usize,
    pub event_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start: StartLocation::default(),
            max_attempts: 3,
            handshake_capacity: 1000,
            event_capacity: 1000,
        }
    }
}

/// Everything a session worker needs, cloned into each connection task.
#[derive(Clone)]
pub struct ServerContext {
    pub registry: Arc<WorldRegistry>,
    pub handshake: HandshakeClient,
    pub events: mpsc::Sender<Event>,
    pub store: Arc<dyn PlayerStore>,
    pub shutdown: ShutdownRx,
    pub settings: Arc<Settings>,
}

/// The long-running single-consumer tasks and the context to reach them.
pub struct Services {
    pub context: ServerContext,
    pub handshake_task: JoinHandle<()>,
    pub world_task: JoinHandle<()>,
}

impl Services {
    /// Wait for both service tasks to stop.
    pub async fn join(self) {
        drop(self.context);
        if let Err(e) = self.handshake_task.await {
            tracing::error!("handshake task failed: {}", e);
        }
        if let Err(e) = self.world_task.await {
            tracing::error!("world task failed: {}", e);
        }
    }
}

/// Spawn the handshake service and the world loop.
pub fn start_services(
    registry: Arc<WorldRegistry>,
    atlas: Arc<RoomAtlas>,
    store: Arc<dyn PlayerStore>,
    settings: Settings,
    shutdown: ShutdownRx,
) -> Services {
    let (handshake_tx, handshake_rx) = mpsc::channel(settings.handshake_capacity.max(1));
    let (event_tx, event_rx) = mpsc::channel(settings.event_capacity.max(1));

    let service = HandshakeService::new(Arc::clone(&registry), Arc::clone(&store), settings.start.clone());
    let handshake_task = tokio::spawn(run_handshake_service(handshake_rx, service, shutdown.clone()));

    let world = World::new(Arc::clone(&registry), atlas);
    let world_task = tokio::spawn(run_world_loop(event_rx, world, shutdown.clone()));

    let context = ServerContext {
        registry,
        handshake: HandshakeClient::new(handshake_tx),
        events: event_tx,
        store,
        shutdown,
        settings: Arc::new(settings),
    };

    Services {
        context,
        handshake_task,
        world_task,
    }
}

/// Accept connections until shutdown, one session worker per connection.
/// Returns once every session has closed and saved its player.
pub async fn serve(listener: TcpListener, ctx: ServerContext) -> std::io::Result<()> {
    let shutdown = ctx.shutdown.clone();
    net::server::run_tcp_server_with_shutdown(listener, shutdown, move |stream, peer, session_id| {
        worker::handle_connection(stream, peer, session_id, ctx.clone())
    })
    .await
}
