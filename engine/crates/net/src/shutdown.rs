use tokio::sync::watch;

/// Triggering half of the server-wide stop signal.
#[derive(Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

/// Listening half. Every long-running task owns a clone and races
/// [`ShutdownRx::wait`] against whatever it is blocked on.
#[derive(Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

pub fn shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

impl ShutdownTx {
    /// Flip the signal. Idempotent.
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }

    /// Number of live listeners.
    pub fn listeners(&self) -> usize {
        self.0.receiver_count()
    }
}

impl ShutdownRx {
    /// Resolve once the signal is set, or once every sender is gone.
    ///
    /// Cancel safe.
    pub async fn wait(&mut self) {
        // Err means every sender was dropped.
        let _ = self.0.wait_for(|stop| *stop).await;
    }
}
