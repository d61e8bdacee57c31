use serde::{Deserialize, Serialize};

/// Character stats carried with a player record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub level: u32,
    pub health: i32,
    pub max_health: i32,
    pub attack: i32,
    pub defense: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            level: 1,
            health: 100,
            max_health: 100,
            attack: 10,
            defense: 3,
        }
    }
}

/// Where newly created characters are placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartLocation {
    pub area: String,
    pub room: String,
    /// Id of the cube the character starts on.
    pub position: String,
}

impl Default for StartLocation {
    fn default() -> Self {
        Self {
            area: "City".to_string(),
            room: "Inn".to_string(),
            position: "1".to_string(),
        }
    }
}

/// Persistent player record, keyed by username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    #[serde(default)]
    pub stats: Stats,
    pub area: String,
    pub room: String,
    /// Id of the cube the player stands on in its room.
    pub position: String,
}

impl Player {
    /// A fresh character at the given start location.
    pub fn new(username: impl Into<String>, start: &StartLocation) -> Self {
        Self {
            username: username.into(),
            stats: Stats::default(),
            area: start.area.clone(),
            room: start.room.clone(),
            position: start.position.clone(),
        }
    }
}
