pub mod conn;
pub mod server;
pub mod shutdown;
pub mod telnet;

pub use conn::{LineReader, LineWriter};
pub use shutdown::{shutdown_channel, ShutdownRx, ShutdownTx};
