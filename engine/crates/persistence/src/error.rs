use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("invalid username {0:?}")]
    InvalidUsername(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("duplicate area name {0:?}")]
    DuplicateArea(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<toml::de::Error> for PersistenceError {
    fn from(e: toml::de::Error) -> Self {
        PersistenceError::Decode(e.to_string())
    }
}

impl From<toml::ser::Error> for PersistenceError {
    fn from(e: toml::ser::Error) -> Self {
        PersistenceError::Encode(e.to_string())
    }
}
