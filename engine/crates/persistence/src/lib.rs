pub mod areas;
pub mod error;
pub mod player;
pub mod store;

pub use areas::load_areas;
pub use error::PersistenceError;
pub use player::{Player, StartLocation, Stats};
pub use store::{FileStore, MemoryStore, PlayerStore};
