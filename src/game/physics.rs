//! Dead reckoning between authoritative updates

use std::time::Duration;

use crate::config::GameConfig;

use super::state::{Moveable, WorldState};

/// Predicts object motion while no fresh server state is available.
/// Never resolves collisions; the server stays authoritative.
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance every moving object in `state` by `elapsed`.
    ///
    /// Tanks move only while `is_moving`; shells always move. Speeds come
    /// from the game configuration, not from the server.
    pub fn extrapolate(state: &mut WorldState, config: &GameConfig, elapsed: Duration) {
        let dt = elapsed.as_secs_f64();
        if dt <= 0.0 {
            return;
        }

        let tank_distance = config.tank.speed * dt;
        let shell_distance = config.shell.speed * dt;

        if state.my_tank.is_moving {
            state.my_tank.advance(tank_distance);
        }

        for tank in state.other_tanks.values_mut().filter(|t| t.is_moving) {
            tank.advance(tank_distance);
        }

        for shell in &mut state.shells {
            shell.advance(shell_distance);
        }
    }
}
