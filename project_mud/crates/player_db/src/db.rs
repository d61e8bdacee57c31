use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use persistence::{PersistenceError, Player, PlayerStore};
use rusqlite::Connection;
use session::is_valid_username;

use crate::error::PlayerDbError;
use crate::player::PlayerRepo;
use crate::schema;

/// SQLite player database. The connection sits behind a mutex so the
/// handle can be shared across tasks as a [`PlayerStore`].
pub struct PlayerDb {
    conn: Mutex<Connection>,
}

impl PlayerDb {
    /// Open (or create) a database at the given file path.
    pub fn open(path: &Path) -> Result<Self, PlayerDbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        schema::create_tables(&conn)?;
        tracing::info!(path = %path.display(), "Player database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self, PlayerDbError> {
        let conn = Connection::open_in_memory()?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the player repository while holding the connection.
    pub fn with_players<T>(
        &self,
        f: impl FnOnce(&PlayerRepo<'_>) -> Result<T, PlayerDbError>,
    ) -> Result<T, PlayerDbError> {
        let conn = self.lock();
        f(&PlayerRepo::new(&conn))
    }
}

fn check_username(username: &str) -> Result<(), PersistenceError> {
    if is_valid_username(username) {
        Ok(())
    } else {
        Err(PersistenceError::InvalidUsername(username.to_string()))
    }
}

impl From<PlayerDbError> for PersistenceError {
    fn from(e: PlayerDbError) -> Self {
        match e {
            PlayerDbError::InvalidUsername(name) => PersistenceError::InvalidUsername(name),
            PlayerDbError::Stats(e) => PersistenceError::Decode(e.to_string()),
            other => PersistenceError::Backend(other.to_string()),
        }
    }
}

impl PlayerStore for PlayerDb {
    fn load_player(&self, username: &str) -> Result<Option<Player>, PersistenceError> {
        check_username(username)?;
        let record = self.with_players(|players| players.get(username))?;
        if record.is_some() {
            tracing::info!(username, "Loaded player");
        }
        Ok(record.map(|r| r.player))
    }

    fn save_player(&self, player: &Player) -> Result<(), PersistenceError> {
        check_username(&player.username)?;
        self.with_players(|players| players.save(player))?;
        tracing::debug!(username = %player.username, "Player saved");
        Ok(())
    }
}
