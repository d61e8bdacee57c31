pub mod events;

pub use events::{normalize_command, parse_line, EventKind};
