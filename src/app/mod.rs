//! Session wiring: network client, game loop and shutdown handling

mod session;

pub use session::{shutdown_signal, Session, SessionReport};
