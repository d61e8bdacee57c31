/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (all platforms).
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => { tracing::info!("Received SIGINT"); }
            _ = sigterm.recv() => { tracing::info!("Received SIGTERM"); }
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C");
        Ok(())
    }
}
