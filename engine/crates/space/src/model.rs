use serde::{Deserialize, Serialize};

use crate::grid::{GridPos, MAX_COORDINATE};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GridError {
    #[error("cube {id:?} has invalid coordinate {axis}={value:?}")]
    InvalidCoordinate {
        id: String,
        axis: &'static str,
        value: String,
    },

    #[error("cube {id:?} coordinate {axis}={value} exceeds {max}")]
    CoordinateTooLarge {
        id: String,
        axis: &'static str,
        value: usize,
        max: usize,
    },

    #[error("duplicate area name {0:?}")]
    DuplicateArea(String),
}

/// A placed object in a room. Coordinates are stored as text, the way area
/// files declare them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cube {
    pub id: String,
    pub posx: String,
    pub posy: String,
}

impl Cube {
    pub fn new(id: impl Into<String>, x: u32, y: u32) -> Self {
        Self {
            id: id.into(),
            posx: x.to_string(),
            posy: y.to_string(),
        }
    }

    /// A cube without an identifier marks an empty cell.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Parse the text coordinates into a grid position.
    pub fn position(&self) -> Result<GridPos, GridError> {
        let parse = |axis: &'static str, value: &str| {
            let n = value
                .trim()
                .parse::<usize>()
                .map_err(|_| GridError::InvalidCoordinate {
                    id: self.id.clone(),
                    axis,
                    value: value.to_string(),
                })?;
            if n > MAX_COORDINATE {
                return Err(GridError::CoordinateTooLarge {
                    id: self.id.clone(),
                    axis,
                    value: n,
                    max: MAX_COORDINATE,
                });
            }
            Ok(n)
        };
        Ok(GridPos::new(parse("x", &self.posx)?, parse("y", &self.posy)?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Room {
    pub name: String,
    pub description: String,
    pub cubes: Vec<Cube>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Area {
    pub name: String,
    pub rooms: Vec<Room>,
}

impl Area {
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_position_parses_text() {
        let cube = Cube {
            id: "1".into(),
            posx: "3".into(),
            posy: " 4 ".into(),
        };
        assert_eq!(cube.position(), Ok(GridPos::new(3, 4)));
    }

    #[test]
    fn cube_position_rejects_garbage() {
        let cube = Cube {
            id: "1".into(),
            posx: "-1".into(),
            posy: "0".into(),
        };
        assert!(matches!(
            cube.position(),
            Err(GridError::InvalidCoordinate { axis: "x", .. })
        ));

        let cube = Cube {
            id: "2".into(),
            posx: "0".into(),
            posy: "north".into(),
        };
        assert!(matches!(
            cube.position(),
            Err(GridError::InvalidCoordinate { axis: "y", .. })
        ));

        let cube = Cube {
            id: "3".into(),
            posx: "1000000".into(),
            posy: "0".into(),
        };
        assert!(matches!(
            cube.position(),
            Err(GridError::CoordinateTooLarge { axis: "x", value: 1_000_000, .. })
        ));
    }

    #[test]
    fn area_room_lookup() {
        let area = Area {
            name: "City".into(),
            rooms: vec![Room {
                name: "Inn".into(),
                ..Default::default()
            }],
        };
        assert!(area.room("Inn").is_some());
        assert!(area.room("Forge").is_none());
    }
}
