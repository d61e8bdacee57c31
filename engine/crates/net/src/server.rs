use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use session::SessionId;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

use crate::shutdown::ShutdownRx;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(0);

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections until shutdown, running `handler` as one task per
/// connection.
///
/// On shutdown the listener is closed and this waits for every connection
/// task to finish before returning.
pub async fn run_tcp_server_with_shutdown<H, Fut>(
    listener: TcpListener,
    mut shutdown_rx: ShutdownRx,
    handler: H,
) -> Result<(), std::io::Error>
where
    H: Fn(TcpStream, SocketAddr, SessionId) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    tracing::info!("TCP server listening on {}", listener.local_addr()?);
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.wait() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    let session_id = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
                    tracing::info!(%session_id, %peer_addr, "New connection");
                    sessions.spawn(handler(stream, peer_addr, session_id));
                }
                Err(e) => {
                    tracing::warn!("accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            },
            Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                log_join(joined);
            }
        }
    }

    drop(listener);
    tracing::info!(open = sessions.len(), "TCP server stopped accepting, waiting for sessions");
    while let Some(joined) = sessions.join_next().await {
        log_join(joined);
    }
    tracing::info!("TCP server shut down");
    Ok(())
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!("session task panicked: {}", e);
        }
    }
}
