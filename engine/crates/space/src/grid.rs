use std::fmt;

use crate::model::Cube;

/// Smallest extent a materialized grid is padded up to, before the final `+1`.
pub const MIN_GRID_EXTENT: usize = 5;

/// Largest coordinate a cube may declare. Bounds a grid at
/// `(MAX_COORDINATE + 1)^2` cells.
pub const MAX_COORDINATE: usize = 255;

/// Cell coordinate inside a room grid. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

impl GridPos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// The adjacent cell in `dir`, or `None` when it would leave the
    /// non-negative quadrant.
    pub fn step(self, dir: Direction) -> Option<GridPos> {
        let (x, y) = match dir {
            Direction::North => (Some(self.x), self.y.checked_sub(1)),
            Direction::South => (Some(self.x), self.y.checked_add(1)),
            Direction::East => (self.x.checked_add(1), Some(self.y)),
            Direction::West => (self.x.checked_sub(1), Some(self.y)),
        };
        Some(GridPos::new(x?, y?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::North => write!(f, "north"),
            Direction::South => write!(f, "south"),
            Direction::East => write!(f, "east"),
            Direction::West => write!(f, "west"),
        }
    }
}

/// Dense square grid of a room, indexed `[x][y]`.
///
/// Built once from the room's sparse cube list and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomGrid {
    side: usize,
    cells: Vec<Option<Cube>>,
}

impl RoomGrid {
    /// Materialize the grid for a room's cube list.
    ///
    /// The side is the largest x or y coordinate, floored at
    /// [`MIN_GRID_EXTENT`], plus one. Cubes with an empty id leave their cell
    /// empty; cubes whose coordinates do not parse or exceed
    /// [`MAX_COORDINATE`] are skipped.
    pub fn materialize(cubes: &[Cube]) -> Self {
        let placed: Vec<(usize, usize, &Cube)> = cubes
            .iter()
            .filter_map(|cube| match cube.position() {
                Ok(pos) => Some((pos.x, pos.y, cube)),
                Err(e) => {
                    tracing::warn!("skipping cube: {}", e);
                    None
                }
            })
            .collect();

        let biggest = placed
            .iter()
            .map(|&(x, y, _)| x.max(y))
            .max()
            .unwrap_or(0);
        let side = biggest.max(MIN_GRID_EXTENT) + 1;

        let mut cells = vec![None; side * side];
        for (x, y, cube) in placed {
            if !cube.is_empty() {
                cells[x * side + y] = Some(cube.clone());
            }
        }

        Self { side, cells }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x < self.side && pos.y < self.side
    }

    /// The cube at `pos`, if the cell is occupied.
    pub fn get(&self, pos: GridPos) -> Option<&Cube> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.cells[pos.x * self.side + pos.y].as_ref()
    }

    /// Find the cell holding the cube with the given id.
    pub fn locate(&self, cube_id: &str) -> Option<GridPos> {
        if cube_id.is_empty() {
            return None;
        }
        self.cells
            .iter()
            .position(|c| c.as_ref().is_some_and(|c| c.id == cube_id))
            .map(|i| GridPos::new(i / self.side, i % self.side))
    }

    /// The occupied cell adjacent to `from` in `dir`, if any.
    pub fn neighbor(&self, from: GridPos, dir: Direction) -> Option<(GridPos, &Cube)> {
        let to = from.step(dir)?;
        self.get(to).map(|cube| (to, cube))
    }

    /// Directions leading from `from` to an occupied cell.
    pub fn exits(&self, from: GridPos) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&d| self.neighbor(from, d).is_some())
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}
