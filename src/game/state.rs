//! World state as seen by this client

use std::collections::HashMap;

/// Server-assigned tank identifier. Not stable across connections.
pub type TankId = i64;

/// Anything that can be moved along its own heading
pub trait Moveable {
    fn center(&self) -> (f64, f64);
    fn set_center(&mut self, x: f64, y: f64);
    fn heading(&self) -> f64;

    /// Move `distance` pixels along the current heading.
    /// y is subtracted because +y points down while headings follow the
    /// standard counter-clockwise convention.
    fn advance(&mut self, distance: f64) {
        let (x, y) = self.center();
        let heading = self.heading();
        self.set_center(x + heading.cos() * distance, y - heading.sin() * distance);
    }
}

/// A tank on the field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tank {
    pub id: TankId,
    /// Center x, pixels from the left edge
    pub center_x: f64,
    /// Center y, pixels from the top edge
    pub center_y: f64,
    /// Radians from the positive x axis
    pub heading: f64,
    pub is_moving: bool,
    pub is_alive: bool,

    // Owner-only fields, `None` for other players' tanks
    pub can_shoot: Option<bool>,
    pub name: Option<String>,
    pub info: Option<String>,
    /// Kills in the current round
    pub kills: Option<i64>,
    /// Rounds won
    pub wins: Option<i64>,
}

impl Moveable for Tank {
    fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    fn set_center(&mut self, x: f64, y: f64) {
        self.center_x = x;
        self.center_y = y;
    }

    fn heading(&self) -> f64 {
        self.heading
    }
}

/// A shell in flight. Shells on the map are always moving.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shell {
    pub shooter_id: TankId,
    pub center_x: f64,
    pub center_y: f64,
    pub heading: f64,
}

impl Moveable for Shell {
    fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    fn set_center(&mut self, x: f64, y: f64) {
        self.center_x = x;
        self.center_y = y;
    }

    fn heading(&self) -> f64 {
        self.heading
    }
}

/// A static rectangular wall
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl Default for Wall {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            center_x: 0.0,
            center_y: 0.0,
        }
    }
}

/// The full game state: all tanks, shells and walls on the map
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldState {
    /// True while a round is being played
    pub is_round_active: bool,
    /// The tank this client controls
    pub my_tank: Tank,
    /// Everyone else, by id
    pub other_tanks: HashMap<TankId, Tank>,
    pub shells: Vec<Shell>,
    /// Walls for the current round. Replaced wholesale, never edited piecemeal.
    pub walls: Vec<Wall>,
}
