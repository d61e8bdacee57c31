//! Registration handshake.
//!
//! One task owns the request queue, so existence checks and character
//! creation for any username are serialized: two connections racing to
//! create the same new name get exactly one `Created` between them.

use std::sync::Arc;

use net::ShutdownRx;
use persistence::{Player, PlayerStore, StartLocation};
use tokio::sync::{mpsc, oneshot};

use crate::error::HandshakeError;
use crate::registry::WorldRegistry;

type Reply<T> = oneshot::Sender<Result<T, HandshakeError>>;

#[derive(Debug)]
pub enum HandshakeRequest {
    /// Does `username` have a character? Loads it into the registry if so.
    Lookup { username: String, reply: Reply<bool> },
    /// Create a character for `username` unless one already exists.
    Create {
        username: String,
        reply: Reply<CreateOutcome>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

pub struct HandshakeService {
    registry: Arc<WorldRegistry>,
    store: Arc<dyn PlayerStore>,
    start: StartLocation,
}

impl HandshakeService {
    pub fn new(registry: Arc<WorldRegistry>, store: Arc<dyn PlayerStore>, start: StartLocation) -> Self {
        Self {
            registry,
            store,
            start,
        }
    }

    async fn handle(&self, request: HandshakeRequest) {
        match request {
            HandshakeRequest::Lookup { username, reply } => {
                let result = self.lookup(&username).await;
                if let Err(e) = &result {
                    tracing::error!(%username, "lookup failed: {}", e);
                }
                if reply.send(result).is_err() {
                    tracing::debug!(%username, "lookup requester went away");
                }
            }
            HandshakeRequest::Create { username, reply } => {
                let result = self.create(&username).await;
                if let Err(e) = &result {
                    tracing::error!(%username, "create failed: {}", e);
                }
                if reply.send(result).is_err() {
                    tracing::debug!(%username, "create requester went away");
                }
            }
        }
    }

    async fn lookup(&self, username: &str) -> Result<bool, HandshakeError> {
        if self.registry.get_player(username).is_some() {
            return Ok(true);
        }

        let store = Arc::clone(&self.store);
        let name = username.to_string();
        let loaded = tokio::task::spawn_blocking(move || store.load_player(&name))
            .await
            .map_err(|e| HandshakeError::Task(e.to_string()))??;

        match loaded {
            Some(player) => {
                self.registry.insert_player_if_absent(player);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create(&self, username: &str) -> Result<CreateOutcome, HandshakeError> {
        if self.lookup(username).await? {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let player = Player::new(username, &self.start);
        let store = Arc::clone(&self.store);
        let to_save = player.clone();
        tokio::task::spawn_blocking(move || store.save_player(&to_save))
            .await
            .map_err(|e| HandshakeError::Task(e.to_string()))??;

        self.registry.insert_player_if_absent(player);
        tracing::info!(
            %username,
            area = %self.start.area,
            room = %self.start.room,
            "Created player"
        );
        Ok(CreateOutcome::Created)
    }
}

/// Drain the handshake queue until shutdown or until every sender is gone.
pub async fn run_handshake_service(
    mut rx: mpsc::Receiver<HandshakeRequest>,
    service: HandshakeService,
    mut shutdown: ShutdownRx,
) {
    tracing::info!("Handshake service started");
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            request = rx.recv() => match request {
                Some(request) => service.handle(request).await,
                None => break,
            },
        }
    }
    tracing::info!("Handshake service stopped");
}

/// Submitting side of the handshake queue, cloned into each session worker.
#[derive(Debug, Clone)]
pub struct HandshakeClient {
    tx: mpsc::Sender<HandshakeRequest>,
}

impl HandshakeClient {
    pub fn new(tx: mpsc::Sender<HandshakeRequest>) -> Self {
        Self { tx }
    }

    pub async fn lookup(&self, username: &str, shutdown: &mut ShutdownRx) -> Result<bool, HandshakeError> {
        let username = username.to_string();
        self.call(|reply| HandshakeRequest::Lookup { username, reply }, shutdown)
            .await
    }

    pub async fn create(
        &self,
        username: &str,
        shutdown: &mut ShutdownRx,
    ) -> Result<CreateOutcome, HandshakeError> {
        let username = username.to_string();
        self.call(|reply| HandshakeRequest::Create { username, reply }, shutdown)
            .await
    }

    /// Enqueue a request and wait for its reply. A full queue blocks here;
    /// both waits give way to shutdown.
    async fn call<T>(
        &self,
        request: impl FnOnce(Reply<T>) -> HandshakeRequest,
        shutdown: &mut ShutdownRx,
    ) -> Result<T, HandshakeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        tokio::select! {
            biased;
            _ = shutdown.wait() => return Err(HandshakeError::ShuttingDown),
            sent = self.tx.send(request(reply_tx)) => {
                sent.map_err(|_| HandshakeError::Unavailable)?;
            }
        }
        tokio::select! {
            biased;
            _ = shutdown.wait() => Err(HandshakeError::ShuttingDown),
            reply = reply_rx => reply.map_err(|_| HandshakeError::Unavailable)?,
        }
    }
}
