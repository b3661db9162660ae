//! WebSocket protocol definitions
//! Outbound command objects and the key names of inbound game state documents

use serde::{Deserialize, Serialize};

/// A command sent to the server on behalf of the player. Commands control the player's tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "arg")]
pub enum Command {
    /// Drive along the current heading until `Stop` or a collision
    #[serde(rename = "Command_Go")]
    Go,

    /// Stop the tank
    #[serde(rename = "Command_Stop")]
    Stop,

    /// Turn to a new heading, in radians from the positive x axis
    #[serde(rename = "Command_Turn")]
    Turn(f64),

    /// Fire along a heading, in radians from the positive x axis.
    /// The server may refuse while reloading.
    #[serde(rename = "Command_Fire")]
    Fire(f64),

    /// Set the player's info string shown by the server
    #[serde(rename = "Command_Info")]
    SetInfo(String),
}

impl Command {
    /// Wire name of the action
    pub fn action(&self) -> &'static str {
        match self {
            Command::Go => "Command_Go",
            Command::Stop => "Command_Stop",
            Command::Turn(_) => "Command_Turn",
            Command::Fire(_) => "Command_Fire",
            Command::SetInfo(_) => "Command_Info",
        }
    }

    /// Encode as a JSON text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Key names used by the server's game state documents.
/// Keys are top-level unless noted.
pub mod keys {
    pub const ONGOING_GAME: &str = "ongoingGame";
    pub const MY_TANK: &str = "myTank";
    pub const OTHER_TANKS: &str = "tanks";
    pub const SHELLS: &str = "shells";
    pub const WALLS: &str = "walls";

    // Nested inside tanks, shells and walls
    pub const ID: &str = "id";
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const HEADING: &str = "heading";
    pub const MOVING: &str = "moving";
    pub const ALIVE: &str = "alive";

    // Nested inside `myTank` only
    pub const CAN_SHOOT: &str = "canShoot";
    pub const NAME: &str = "name";
    pub const INFO: &str = "info";
    pub const KILLS: &str = "kills";
    pub const WINS: &str = "wins";

    // Nested inside shells
    pub const SHOOTER_ID: &str = "shooterId";

    // Nested inside walls
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
}
