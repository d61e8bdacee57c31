use std::fmt;

use space::Direction;

/// Typed form of a player command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Look,
    MoveNorth,
    MoveSouth,
    MoveEast,
    MoveWest,
    Quit,
    /// Unrecognized command, carrying the text the player typed.
    Unknown(String),
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Look => "look",
            EventKind::MoveNorth => "move_north",
            EventKind::MoveSouth => "move_south",
            EventKind::MoveEast => "move_east",
            EventKind::MoveWest => "move_west",
            EventKind::Quit => "quit",
            EventKind::Unknown(_) => "unknown",
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            EventKind::MoveNorth => Some(Direction::North),
            EventKind::MoveSouth => Some(Direction::South),
            EventKind::MoveEast => Some(Direction::East),
            EventKind::MoveWest => Some(Direction::West),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a command token to its event kind.
///
/// Matching is exact and case-sensitive; arguments are not split off, so
/// `"look north"` is unknown. Total: every input yields a kind.
pub fn normalize_command(command: &str) -> EventKind {
    match command {
        "l" | "look" | "map" => EventKind::Look,
        "e" | "east" => EventKind::MoveEast,
        "w" | "west" => EventKind::MoveWest,
        "n" | "north" => EventKind::MoveNorth,
        "s" | "south" => EventKind::MoveSouth,
        "quit" | "exit" => EventKind::Quit,
        other => EventKind::Unknown(other.to_string()),
    }
}

/// Trim a raw input line and normalize it. Blank lines produce no event.
pub fn parse_line(line: &str) -> Option<EventKind> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(normalize_command(trimmed))
}
