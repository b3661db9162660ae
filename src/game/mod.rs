//! Client-side game modules

pub mod decode;
pub mod lifecycle;
pub mod r#loop;
pub mod physics;
pub mod state;
pub mod stats;

pub use decode::{DecodeError, DecodeReport, FieldDiagnostic, FieldIssue, StateDecoder};
pub use lifecycle::{LifecycleEvent, LifecycleSnapshot};
pub use physics::PhysicsSystem;
pub use r#loop::{FrameOutcome, GameLoop, LoopPhase, LoopStatus};
pub use state::{Moveable, Shell, Tank, TankId, Wall, WorldState};
pub use stats::{FpsMeter, FpsReport};
