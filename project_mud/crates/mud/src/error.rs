use persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("storage error: {0}")]
    Storage(#[from] PersistenceError),

    #[error("storage task failed: {0}")]
    Task(String),

    #[error("registration service unavailable")]
    Unavailable,

    #[error("server is shutting down")]
    ShuttingDown,
}
