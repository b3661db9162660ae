//! Tank client - connects an agent to a pyTanks game server
//!
//! The client keeps a local copy of the world, extrapolates it between
//! server updates at a fixed frame rate, and forwards the agent's commands
//! back to the server:
//! - `net`: connection, inbound buffering, ordered outbound commands
//! - `game`: state decoding, dead reckoning, lifecycle events, the frame loop
//! - `agent`: the decision-making trait and an example agent

pub mod agent;
pub mod app;
pub mod config;
pub mod game;
pub mod net;
pub mod util;
pub mod ws;

pub use agent::{Agent, SimpleAgent};
pub use app::Session;
pub use config::Config;
