pub mod atlas;
pub mod grid;
pub mod model;

pub use atlas::RoomAtlas;
pub use grid::{Direction, GridPos, RoomGrid, MAX_COORDINATE, MIN_GRID_EXTENT};
pub use model::{Area, Cube, GridError, Room};
