//! WebSocket transport and the player wire protocol

pub mod protocol;
pub mod transport;

pub use protocol::Command;
pub use transport::{Transport, TransportError, TransportHandler};
