//! Game constants that must match the server

use std::time::Duration;

/// Map geometry. Origin is the upper left corner, +x right, +y down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

/// Tank properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankConfig {
    /// Pixels per second
    pub speed: f64,
    pub width: f64,
    pub height: f64,
    /// Minimum time between shots, in seconds
    pub reload_time: f64,
}

/// Shell properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellConfig {
    /// Pixels per second
    pub speed: f64,
    pub width: f64,
    pub height: f64,
}

/// Immutable configuration of the game field from the player's perspective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    /// Frame rate the loop tries to hold when processing fits the budget
    pub target_fps: u32,
    pub map: MapConfig,
    pub tank: TankConfig,
    pub shell: ShellConfig,
}

impl GameConfig {
    pub fn new(target_fps: u32) -> Self {
        Self {
            target_fps: target_fps.max(1),
            map: MapConfig {
                width: 500.0,
                height: 500.0,
            },
            tank: TankConfig {
                speed: 30.0,
                width: 10.0,
                height: 10.0,
                reload_time: 1.5,
            },
            shell: ShellConfig {
                speed: 150.0,
                width: 1.0,
                height: 1.0,
            },
        }
    }

    /// Time budget of a single frame
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps as f64)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_budget_follows_target_rate() {
        assert_eq!(GameConfig::new(100).frame_duration(), Duration::from_millis(10));
        assert_eq!(GameConfig::new(0).target_fps, 1);
    }
}
