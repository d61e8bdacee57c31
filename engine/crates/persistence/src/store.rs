use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use session::is_valid_username;

use crate::error::PersistenceError;
use crate::player::Player;

/// Storage for player records.
///
/// Implementations must reject usernames failing [`is_valid_username`]
/// before touching storage.
pub trait PlayerStore: Send + Sync {
    /// Load a player. `Ok(None)` means no record exists.
    fn load_player(&self, username: &str) -> Result<Option<Player>, PersistenceError>;

    /// Create or overwrite the record for `player.username`.
    fn save_player(&self, player: &Player) -> Result<(), PersistenceError>;
}

fn check_username(username: &str) -> Result<(), PersistenceError> {
    if is_valid_username(username) {
        Ok(())
    } else {
        Err(PersistenceError::InvalidUsername(username.to_string()))
    }
}

/// One TOML file per player: `<dir>/<username>.toml`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, username: &str) -> Result<PathBuf, PersistenceError> {
        check_username(username)?;
        Ok(self.dir.join(format!("{}.toml", username)))
    }
}

impl PlayerStore for FileStore {
    fn load_player(&self, username: &str) -> Result<Option<Player>, PersistenceError> {
        let path = self.path_for(username)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            tracing::warn!(path = %path.display(), "player file could not be loaded: {}", e);
            e
        })?;
        let player: Player = toml::from_str(&content).map_err(|e| {
            tracing::warn!(path = %path.display(), "player file could not be decoded: {}", e);
            PersistenceError::from(e)
        })?;

        if player.username != username {
            return Err(PersistenceError::Corrupt(format!(
                "{} holds player {:?}",
                path.display(),
                player.username
            )));
        }

        tracing::info!(username, "Loaded player");
        Ok(Some(player))
    }

    fn save_player(&self, player: &Player) -> Result<(), PersistenceError> {
        let path = self.path_for(&player.username)?;
        std::fs::create_dir_all(&self.dir)?;

        let content = toml::to_string(player)?;

        // Write to temp file first, then rename for atomicity
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content.as_bytes())?;
        std::fs::rename(&tmp_path, &path)?;

        tracing::debug!(username = %player.username, path = %path.display(), "Player saved");
        Ok(())
    }
}

/// Volatile store; records live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    players: Mutex<BTreeMap<String, Player>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PlayerStore for MemoryStore {
    fn load_player(&self, username: &str) -> Result<Option<Player>, PersistenceError> {
        check_username(username)?;
        let players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(players.get(username).cloned())
    }

    fn save_player(&self, player: &Player) -> Result<(), PersistenceError> {
        check_username(&player.username)?;
        let mut players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
        players.insert(player.username.clone(), player.clone());
        Ok(())
    }
}
