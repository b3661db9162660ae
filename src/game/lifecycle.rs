//! Round and tank lifecycle transitions

use super::state::WorldState;

/// A one-time notification derived from comparing consecutive frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Round went from inactive to active
    RoundStarting,
    /// Local tank went from alive to dead
    TankKilled,
    /// Round went from active to inactive
    RoundOver,
}

/// The parts of a state that lifecycle detection looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleSnapshot {
    pub round_active: bool,
    pub tank_alive: bool,
}

impl LifecycleSnapshot {
    pub fn of(state: &WorldState) -> Self {
        Self {
            round_active: state.is_round_active,
            tank_alive: state.my_tank.is_alive,
        }
    }

    /// Events between `self` (previous frame) and `next`, in firing order.
    /// Steady state produces nothing.
    pub fn transitions_to(&self, next: &LifecycleSnapshot) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        if !self.round_active && next.round_active {
            events.push(LifecycleEvent::RoundStarting);
        }
        if self.tank_alive && !next.tank_alive {
            events.push(LifecycleEvent::TankKilled);
        }
        if self.round_active && !next.round_active {
            events.push(LifecycleEvent::RoundOver);
        }
        events
    }
}
