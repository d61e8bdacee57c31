use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Timing for one event handled by the world-update loop.
#[derive(Debug, Clone)]
pub struct EventMetrics {
    /// Sequence number of the event since the loop started.
    pub seq: u64,
    pub kind: &'static str,
    pub username: String,
    pub duration_us: u128,
    /// Sessions online when the event finished.
    pub online: usize,
}

impl EventMetrics {
    pub const BUDGET_US: u128 = 5_000;

    pub fn over_budget(&self) -> bool {
        self.duration_us > Self::BUDGET_US
    }

    pub fn log(&self) {
        if self.over_budget() {
            tracing::warn!(
                seq = self.seq,
                kind = self.kind,
                username = %self.username,
                duration_us = self.duration_us,
                online = self.online,
                "event exceeded budget ({}us > {}us)",
                self.duration_us,
                Self::BUDGET_US
            );
        } else {
            tracing::debug!(
                seq = self.seq,
                kind = self.kind,
                username = %self.username,
                duration_us = self.duration_us,
                online = self.online,
                "event processed"
            );
        }
    }
}
