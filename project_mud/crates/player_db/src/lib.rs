pub mod db;
pub mod error;
pub mod player;
mod schema;

pub use db::PlayerDb;
pub use error::PlayerDbError;
pub use player::{PlayerRecord, PlayerRepo};
