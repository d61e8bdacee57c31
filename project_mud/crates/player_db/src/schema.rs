use rusqlite::Connection;

use crate::error::PlayerDbError;

pub fn create_tables(conn: &Connection) -> Result<(), PlayerDbError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS players (
            username    TEXT PRIMARY KEY NOT NULL,
            stats       TEXT NOT NULL DEFAULT '{}',
            area        TEXT NOT NULL,
            room        TEXT NOT NULL,
            position    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            last_played TEXT
        );
        ",
    )?;
    Ok(())
}
