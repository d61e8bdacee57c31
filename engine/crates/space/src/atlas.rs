use std::collections::BTreeMap;

use crate::grid::RoomGrid;
use crate::model::{Area, GridError};

/// Materialized grids for every room of every loaded area.
#[derive(Debug, Default)]
pub struct RoomAtlas {
    grids: BTreeMap<String, BTreeMap<String, RoomGrid>>,
}

impl RoomAtlas {
    /// Build grids for all rooms. Area names must be unique.
    pub fn build(areas: &[Area]) -> Result<Self, GridError> {
        let mut grids: BTreeMap<String, BTreeMap<String, RoomGrid>> = BTreeMap::new();
        for area in areas {
            if grids.contains_key(&area.name) {
                return Err(GridError::DuplicateArea(area.name.clone()));
            }
            let rooms = area
                .rooms
                .iter()
                .map(|room| {
                    let grid = RoomGrid::materialize(&room.cubes);
                    tracing::debug!(
                        area = %area.name,
                        room = %room.name,
                        side = grid.side(),
                        cubes = grid.occupied_count(),
                        "Room grid built"
                    );
                    (room.name.clone(), grid)
                })
                .collect();
            grids.insert(area.name.clone(), rooms);
        }

        let atlas = Self { grids };
        tracing::info!(
            areas = atlas.grids.len(),
            rooms = atlas.room_count(),
            "Room grids materialized"
        );
        Ok(atlas)
    }

    pub fn grid(&self, area: &str, room: &str) -> Option<&RoomGrid> {
        self.grids.get(area)?.get(room)
    }

    pub fn room_count(&self) -> usize {
        self.grids.values().map(|rooms| rooms.len()).sum()
    }
}
