use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerDbError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    #[error("stats column could not be decoded: {0}")]
    Stats(#[from] serde_json::Error),
}
