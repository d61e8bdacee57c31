use persistence::{Player, Stats};
use rusqlite::{Connection, OptionalExtension};

use crate::error::PlayerDbError;

/// A player row, with the bookkeeping columns the game model does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub player: Player,
    pub created_at: String,
    pub last_played: Option<String>,
}

struct RawRow {
    username: String,
    stats: String,
    area: String,
    room: String,
    position: String,
    created_at: String,
    last_played: Option<String>,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            username: row.get(0)?,
            stats: row.get(1)?,
            area: row.get(2)?,
            room: row.get(3)?,
            position: row.get(4)?,
            created_at: row.get(5)?,
            last_played: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<PlayerRecord, PlayerDbError> {
        let stats: Stats = serde_json::from_str(&self.stats)?;
        Ok(PlayerRecord {
            player: Player {
                username: self.username,
                stats,
                area: self.area,
                room: self.room,
                position: self.position,
            },
            created_at: self.created_at,
            last_played: self.last_played,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT username, stats, area, room, position, created_at, last_played FROM players";

/// Repository for player rows.
pub struct PlayerRepo<'a> {
    conn: &'a Connection,
}

impl<'a> PlayerRepo<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or overwrite a player and stamp `last_played`.
    pub fn save(&self, player: &Player) -> Result<(), PlayerDbError> {
        let stats = serde_json::to_string(&player.stats)?;
        self.conn.execute(
            "INSERT INTO players (username, stats, area, room, position, last_played)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
             ON CONFLICT(username) DO UPDATE SET
                stats = excluded.stats,
                area = excluded.area,
                room = excluded.room,
                position = excluded.position,
                last_played = excluded.last_played",
            rusqlite::params![player.username, stats, player.area, player.room, player.position],
        )?;
        Ok(())
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, username: &str) -> Result<Option<PlayerRecord>, PlayerDbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE username = ?1", SELECT_COLUMNS))?;
        let raw = stmt
            .query_row(rusqlite::params![username], RawRow::from_row)
            .optional()?;
        raw.map(RawRow::into_record).transpose()
    }
}
