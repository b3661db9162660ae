//! Network client: inbound message buffering and the outbound command path

pub mod client;
pub mod queue;

pub use client::{CommandError, CommandSender, NetworkClient, SessionSignals};
pub use queue::MessageQueue;
