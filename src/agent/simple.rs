//! Example agent: keep moving, turn when stopped, shoot at random tanks

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::game::WorldState;
use crate::ws::protocol::Command;

use super::Agent;

/// Keeps moving, turning a random new direction whenever it stops (usually
/// after hitting something). Shoots as fast as it can at a randomly chosen
/// tank, skipping the shot if that tank is dead. Ignores walls when aiming.
pub struct SimpleAgent {
    rng: StdRng,
    /// Send `Go` next frame without further analysis
    go_next_frame: bool,
}

impl SimpleAgent {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic agent for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            go_next_frame: false,
        }
    }
}

impl Default for SimpleAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for SimpleAgent {
    fn connected_to_server(&mut self) {
        debug!("connected_to_server");
    }

    fn round_starting(&mut self, _state: &WorldState) {
        debug!("round_starting");
        self.go_next_frame = false;
    }

    fn make_move(&mut self, state: &WorldState) -> Vec<Command> {
        if self.go_next_frame {
            self.go_next_frame = false;
            info!("Going");
            return vec![Command::Go];
        }

        let me = &state.my_tank;

        if !me.is_moving {
            self.go_next_frame = true;
            let heading = self.rng.gen_range(-PI..=PI);
            info!(heading, "Turning");
            return vec![Command::Turn(heading)];
        }

        if me.can_shoot.unwrap_or(false) {
            if let Some(target) = state.other_tanks.values().choose(&mut self.rng) {
                if target.is_alive {
                    let dx = target.center_x - me.center_x;
                    let dy = target.center_y - me.center_y;
                    // y axis is flipped relative to the standard radian system
                    let heading = (-dy).atan2(dx);
                    info!(target = target.id, heading, "Firing");
                    return vec![Command::Fire(heading)];
                }
            }
        }

        Vec::new()
    }

    fn tank_killed(&mut self) {
        debug!("tank_killed");
    }

    fn round_over(&mut self) {
        debug!("round_over");
        self.go_next_frame = false;
    }

    fn description_text(&self) -> Option<String> {
        Some("Rust client using the example SimpleAgent.".to_string())
    }
}
