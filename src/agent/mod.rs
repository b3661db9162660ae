//! Agent capability: the brain that drives a tank

pub mod simple;

pub use simple::SimpleAgent;

use crate::game::WorldState;
use crate::ws::protocol::Command;

/// The decision maker for a tank. Implementations keep their own state;
/// the game loop calls them through `&mut self`, one call at a time, on the
/// loop thread.
///
/// The `WorldState` handed to each call is only valid for that call. It is
/// mutated every frame, so clone whatever needs to outlive it.
pub trait Agent {
    /// Called once, on the first game state of the session and before
    /// `round_starting`. Per-session setup belongs here.
    fn connected_to_server(&mut self) {}

    /// Called when a round begins, right before the first `make_move` of the round
    fn round_starting(&mut self, _state: &WorldState) {}

    /// Called every frame while the round is active and the tank is alive.
    /// Returned commands are sent in order.
    fn make_move(&mut self, state: &WorldState) -> Vec<Command>;

    /// Called when this agent's tank is destroyed
    fn tank_killed(&mut self) {}

    /// Called when a round ends
    fn round_over(&mut self) {}

    /// Text sent once to the server as the player's info string
    fn description_text(&self) -> Option<String> {
        None
    }
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn connected_to_server(&mut self) {
        (**self).connected_to_server()
    }

    fn round_starting(&mut self, state: &WorldState) {
        (**self).round_starting(state)
    }

    fn make_move(&mut self, state: &WorldState) -> Vec<Command> {
        (**self).make_move(state)
    }

    fn tank_killed(&mut self) {
        (**self).tank_killed()
    }

    fn round_over(&mut self) {
        (**self).round_over()
    }

    fn description_text(&self) -> Option<String> {
        (**self).description_text()
    }
}
