pub mod context;
pub mod error;
pub mod handshake;
pub mod registry;
pub mod view;
pub mod worker;
pub mod world;

pub use context::{serve, start_services, ServerContext, Services, Settings};
pub use error::HandshakeError;
pub use handshake::{CreateOutcome, HandshakeClient, HandshakeRequest};
pub use registry::{AlreadyOnline, SessionHandle, WorldRegistry};
pub use world::{Event, World};
