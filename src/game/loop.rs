//! Frame-paced game loop
//!
//! Consumes server messages, keeps the world state moving between them,
//! detects round/tank transitions and drives the agent. The loop owns the
//! `WorldState`; no other thread touches it.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::config::GameConfig;
use crate::net::{CommandSender, MessageQueue, NetworkClient, SessionSignals};
use crate::util::time::{spin_until, Timer};
use crate::ws::protocol::Command;

use super::decode::StateDecoder;
use super::lifecycle::{LifecycleEvent, LifecycleSnapshot};
use super::physics::PhysicsSystem;
use super::state::WorldState;
use super::stats::FpsMeter;

/// Poll interval while waiting for the first game state
const WAIT_POLL: Duration = Duration::from_millis(1);

/// Loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LoopPhase {
    /// Not running. Initial and terminal.
    #[default]
    Off = 0,
    /// Thread is held, waiting for the first server message
    Waiting = 1,
    /// Processing frames
    Running = 2,
}

impl LoopPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LoopPhase::Waiting,
            2 => LoopPhase::Running,
            _ => LoopPhase::Off,
        }
    }
}

/// Loop phase and stop flag, readable from any thread
#[derive(Debug)]
pub struct LoopStatus {
    phase: AtomicU8,
    stop_requested: AtomicBool,
}

impl LoopStatus {
    fn new() -> Self {
        Self {
            phase: AtomicU8::new(LoopPhase::Off as u8),
            stop_requested: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> LoopPhase {
        LoopPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn set_phase(&self, phase: LoopPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Ask the loop to end after the current frame
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

/// What happened during one processed frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// A new server state replaced the local one
    pub fresh_state: bool,
    /// Messages decoded this frame; only the newest is kept
    pub states_decoded: usize,
    /// Messages discarded because they failed to decode
    pub decode_failures: usize,
    /// Lifecycle events fired, in order
    pub events: Vec<LifecycleEvent>,
    /// Commands handed to the outbound path
    pub commands_sent: usize,
}

/// The client-side game loop
pub struct GameLoop<A: Agent> {
    queue: Arc<MessageQueue>,
    signals: Arc<SessionSignals>,
    commands: CommandSender,
    agent: A,
    config: GameConfig,
    status: Arc<LoopStatus>,
    /// Current state; `None` until the first message decodes
    state: Option<WorldState>,
    /// Reference point for extrapolation
    sync_clock: Timer,
    /// Start of the previous frame
    frame_clock: Timer,
    fps: FpsMeter,
    fps_log_interval: Duration,
    handshake_done: bool,
}

impl<A: Agent> GameLoop<A> {
    /// Create a loop fed by `client`
    pub fn new(client: &NetworkClient, agent: A, config: GameConfig, fps_log_interval: Duration) -> Self {
        Self::from_parts(
            client.queue(),
            client.signals(),
            client.commands(),
            agent,
            config,
            fps_log_interval,
        )
    }

    /// Create a loop from its individual channels
    pub fn from_parts(
        queue: Arc<MessageQueue>,
        signals: Arc<SessionSignals>,
        commands: CommandSender,
        agent: A,
        config: GameConfig,
        fps_log_interval: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            queue,
            signals,
            commands,
            agent,
            config,
            status: Arc::new(LoopStatus::new()),
            state: None,
            sync_clock: Timer::starting_at(now),
            frame_clock: Timer::starting_at(now),
            fps: FpsMeter::new(fps_log_interval, now),
            fps_log_interval,
            handshake_done: false,
        }
    }

    /// Shared handle to the loop phase
    pub fn status(&self) -> Arc<LoopStatus> {
        self.status.clone()
    }

    /// The current world state, if any message has decoded yet
    pub fn state(&self) -> Option<&WorldState> {
        self.state.as_ref()
    }

    /// Run until the connection ends. Holds the calling thread for the whole
    /// session. Does nothing unless the loop is `Off`.
    pub fn start(&mut self) {
        if self.status.phase() != LoopPhase::Off {
            warn!("Game loop already running");
            return;
        }

        self.status.set_phase(LoopPhase::Waiting);
        debug!("Game loop waiting for first game state");

        while !self.should_stop() {
            match self.status.phase() {
                LoopPhase::Waiting => {
                    if self.signals.has_received() {
                        let now = Instant::now();
                        self.sync_clock = Timer::starting_at(now);
                        self.frame_clock = Timer::starting_at(now);
                        self.fps = FpsMeter::new(self.fps_log_interval, now);
                        self.status.set_phase(LoopPhase::Running);
                        info!(target_fps = self.config.target_fps, "Game loop running");
                    } else {
                        thread::sleep(WAIT_POLL);
                    }
                }
                LoopPhase::Running => self.run_frame(),
                LoopPhase::Off => break,
            }
        }

        self.status.set_phase(LoopPhase::Off);
        info!("Game loop stopped");
    }

    fn should_stop(&self) -> bool {
        self.signals.is_disconnected() || self.status.is_stop_requested()
    }

    /// Process one frame, then hold the thread until the frame budget is spent
    fn run_frame(&mut self) {
        let frame_start = Instant::now();
        let frame_time = self.frame_clock.lap(frame_start);

        self.process_frame(frame_start);

        let deadline = frame_start + self.config.frame_duration();
        let signals = &self.signals;
        let status = &self.status;
        spin_until(deadline, || signals.is_disconnected() || status.is_stop_requested());

        if let Some(report) = self.fps.record(frame_time, Instant::now()) {
            info!(
                target: "fps",
                average = report.average,
                minimum = report.minimum,
                frames = report.frames,
                "Frame rate"
            );
        }
    }

    /// Run the per-frame work at time `now`: drain, decode or extrapolate,
    /// fire lifecycle events and ask the agent for commands.
    pub fn process_frame(&mut self, now: Instant) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        let previous = self
            .state
            .as_ref()
            .map(LifecycleSnapshot::of)
            .unwrap_or_default();

        // Everything queued when the frame began, oldest first. Each message
        // decodes on top of the last good one, so the newest valid state wins.
        let mut fresh: Option<WorldState> = None;
        for _ in 0..self.queue.len() {
            let Some(payload) = self.queue.pop() else {
                break;
            };
            let base = fresh.as_ref().or(self.state.as_ref());
            match StateDecoder::decode(&payload, base) {
                Ok(state) => {
                    outcome.states_decoded += 1;
                    fresh = Some(state);
                }
                Err(e) => {
                    outcome.decode_failures += 1;
                    warn!(error = %e, "Discarding server message");
                }
            }
        }

        match fresh {
            Some(state) => {
                self.state = Some(state);
                self.sync_clock = Timer::starting_at(now);
                outcome.fresh_state = true;
                if !self.handshake_done {
                    self.handshake_done = true;
                    self.handshake(&mut outcome);
                }
            }
            None => {
                if let Some(state) = self.state.as_mut() {
                    let elapsed = self.sync_clock.lap(now);
                    PhysicsSystem::extrapolate(state, &self.config, elapsed);
                }
            }
        }

        let Some(state) = self.state.as_ref() else {
            return outcome;
        };

        outcome.events = previous.transitions_to(&LifecycleSnapshot::of(state));
        for event in &outcome.events {
            match event {
                LifecycleEvent::RoundStarting => {
                    info!(walls = state.walls.len(), tanks = state.other_tanks.len(), "Round starting");
                    self.agent.round_starting(state);
                }
                LifecycleEvent::TankKilled => {
                    info!("Tank killed");
                    self.agent.tank_killed();
                }
                LifecycleEvent::RoundOver => {
                    info!("Round over");
                    self.agent.round_over();
                }
            }
        }

        if state.is_round_active && state.my_tank.is_alive {
            for command in self.agent.make_move(state) {
                match self.commands.send(&command) {
                    Ok(()) => outcome.commands_sent += 1,
                    Err(e) => warn!(action = command.action(), error = %e, "Dropping command"),
                }
            }
        }

        outcome
    }

    /// First game state of the session: publish the agent's description and
    /// tell it the session is up
    fn handshake(&mut self, outcome: &mut FrameOutcome) {
        if let Some(text) = self.agent.description_text() {
            match self.commands.send(&Command::SetInfo(text)) {
                Ok(()) => outcome.commands_sent += 1,
                Err(e) => warn!(error = %e, "Failed to send player info"),
            }
        }
        info!("Session established");
        self.agent.connected_to_server();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::transport::{FrameSender, Outgoing};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    /// Records every callback and replays scripted moves
    #[derive(Clone, Default)]
    struct RecordingAgent {
        calls: Arc<Mutex<Vec<String>>>,
        moves: Vec<Command>,
        description: Option<String>,
    }

    impl RecordingAgent {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl Agent for RecordingAgent {
        fn connected_to_server(&mut self) {
            self.calls.lock().push("connected".into());
        }

        fn round_starting(&mut self, _state: &WorldState) {
            self.calls.lock().push("round_starting".into());
        }

        fn make_move(&mut self, _state: &WorldState) -> Vec<Command> {
            self.calls.lock().push("make_move".into());
            self.moves.clone()
        }

        fn tank_killed(&mut self) {
            self.calls.lock().push("tank_killed".into());
        }

        fn round_over(&mut self) {
            self.calls.lock().push("round_over".into());
        }

        fn description_text(&self) -> Option<String> {
            self.description.clone()
        }
    }

    struct Harness {
        game_loop: GameLoop<RecordingAgent>,
        queue: Arc<MessageQueue>,
        signals: Arc<SessionSignals>,
        sent: mpsc::UnboundedReceiver<Outgoing>,
        agent: RecordingAgent,
    }

    impl Harness {
        fn new(agent: RecordingAgent) -> Self {
            let queue = Arc::new(MessageQueue::new());
            let signals = Arc::new(SessionSignals::new());
            let (frames, sent) = FrameSender::channel();
            let game_loop = GameLoop::from_parts(
                queue.clone(),
                signals.clone(),
                CommandSender::new(frames),
                agent.clone(),
                GameConfig::new(60),
                Duration::from_secs(5),
            );
            Self { game_loop, queue, signals, sent, agent }
        }

        fn push(&self, payload: Value) {
            self.queue.push(Bytes::from(payload.to_string()));
        }

        fn sent_actions(&mut self) -> Vec<String> {
            let mut actions = Vec::new();
            while let Ok(frame) = self.sent.try_recv() {
                if let Outgoing::Text(text) = frame {
                    let wire: Value = serde_json::from_str(&text).unwrap();
                    actions.push(wire["action"].as_str().unwrap().to_string());
                }
            }
            actions
        }
    }

    fn payload(round_active: bool, alive: bool, moving: bool) -> Value {
        json!({
            "ongoingGame": round_active,
            "myTank": {
                "id": 1, "x": 100.0, "y": 100.0, "heading": 0.0,
                "moving": moving, "alive": alive, "canShoot": true, "name": "me"
            },
            "tanks": [ { "id": 2, "x": 10.0, "y": 10.0, "heading": 0.0, "moving": true, "alive": true } ],
            "shells": [ { "shooterId": 2, "x": 20.0, "y": 20.0, "heading": 0.0 } ],
            "walls": [ { "width": 5.0, "height": 5.0, "x": 250.0, "y": 250.0 } ]
        })
    }

    #[test]
    fn malformed_message_is_skipped_for_the_next_valid_one() {
        let mut h = Harness::new(RecordingAgent::default());
        h.queue.push(Bytes::from_static(b"{garbage"));
        h.push(payload(true, true, false));

        let outcome = h.game_loop.process_frame(Instant::now());

        assert!(outcome.fresh_state);
        assert_eq!(outcome.decode_failures, 1);
        assert!(h.game_loop.state().unwrap().is_round_active);
        assert!(h.queue.is_empty());
    }

    #[test]
    fn backlog_is_drained_and_the_newest_state_wins() {
        let mut h = Harness::new(RecordingAgent::default());
        let mut first = payload(false, true, false);
        first["myTank"]["heading"] = json!(1.5);
        h.push(first);
        for x in [110.0, 120.0, 130.0] {
            let mut next = payload(true, true, false);
            next["myTank"]["x"] = json!(x);
            next["myTank"].as_object_mut().unwrap().remove("heading");
            h.push(next);
        }
        h.queue.push(Bytes::from_static(b"not json"));

        let outcome = h.game_loop.process_frame(Instant::now());

        assert!(h.queue.is_empty());
        assert!(outcome.fresh_state);
        assert_eq!(outcome.states_decoded, 4);
        assert_eq!(outcome.decode_failures, 1);
        let state = h.game_loop.state().unwrap();
        assert!(state.is_round_active);
        assert_eq!(state.my_tank.center_x, 130.0);
        // Missing fields fall back to the previous message in the same batch
        assert_eq!(state.my_tank.heading, 1.5);
        // Lifecycle compares against the state before the batch
        assert_eq!(outcome.events, vec![LifecycleEvent::RoundStarting]);
    }

    #[test]
    fn backlog_does_not_grow_when_messages_outpace_frames() {
        let mut h = Harness::new(RecordingAgent::default());
        let start = Instant::now();
        for frame in 0..50u32 {
            for n in 0..2 {
                let mut next = payload(true, true, false);
                next["myTank"]["x"] = json!(f64::from(frame * 2 + n));
                h.push(next);
            }
            h.game_loop
                .process_frame(start + Duration::from_millis(u64::from(frame) * 33));
            assert!(h.queue.is_empty());
        }
        assert_eq!(h.game_loop.state().unwrap().my_tank.center_x, 99.0);
    }

    #[test]
    fn first_state_sends_info_then_connects_before_lifecycle_events() {
        let agent = RecordingAgent {
            moves: vec![Command::Go],
            description: Some("test agent".into()),
            ..RecordingAgent::default()
        };
        let mut h = Harness::new(agent);
        h.push(payload(true, true, false));

        let outcome = h.game_loop.process_frame(Instant::now());

        assert_eq!(outcome.events, vec![LifecycleEvent::RoundStarting]);
        assert_eq!(outcome.commands_sent, 2);
        assert_eq!(h.sent_actions(), vec!["Command_Info", "Command_Go"]);
        assert_eq!(h.agent.calls(), vec!["connected", "round_starting", "make_move"]);

        // Handshake happens once per session
        h.push(payload(true, true, false));
        h.game_loop.process_frame(Instant::now());
        assert_eq!(h.sent_actions(), vec!["Command_Go"]);
        assert_eq!(h.agent.calls().iter().filter(|c| *c == "connected").count(), 1);
    }

    #[test]
    fn no_agent_calls_before_any_state() {
        let mut h = Harness::new(RecordingAgent::default());
        let outcome = h.game_loop.process_frame(Instant::now());
        assert_eq!(outcome, FrameOutcome::default());
        assert!(h.agent.calls().is_empty());
    }

    #[test]
    fn extrapolates_when_no_message_arrives() {
        let mut h = Harness::new(RecordingAgent::default());
        h.push(payload(true, true, true));
        let t0 = Instant::now();
        h.game_loop.process_frame(t0);

        let outcome = h.game_loop.process_frame(t0 + Duration::from_millis(100));
        assert!(!outcome.fresh_state);

        let state = h.game_loop.state().unwrap();
        // heading 0: +x only. Tank speed 30, shell speed 150.
        assert!((state.my_tank.center_x - 103.0).abs() < 1e-9);
        assert!((state.my_tank.center_y - 100.0).abs() < 1e-9);
        assert!((state.other_tanks[&2].center_x - 13.0).abs() < 1e-9);
        assert!((state.shells[0].center_x - 35.0).abs() < 1e-9);
        assert_eq!(state.walls[0].center_x, 250.0);

        // Extrapolation is incremental from the last frame
        h.game_loop.process_frame(t0 + Duration::from_millis(200));
        let state = h.game_loop.state().unwrap();
        assert!((state.my_tank.center_x - 106.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_state_resets_the_extrapolation_clock() {
        let mut h = Harness::new(RecordingAgent::default());
        let t0 = Instant::now();
        h.push(payload(true, true, true));
        h.game_loop.process_frame(t0);

        h.push(payload(true, true, true));
        h.game_loop.process_frame(t0 + Duration::from_secs(1));
        assert_eq!(h.game_loop.state().unwrap().my_tank.center_x, 100.0);

        h.game_loop.process_frame(t0 + Duration::from_millis(1100));
        assert!((h.game_loop.state().unwrap().my_tank.center_x - 103.0).abs() < 1e-9);
    }

    #[test]
    fn tank_death_fires_killed_once_without_round_over() {
        let mut h = Harness::new(RecordingAgent::default());
        h.push(payload(true, true, false));
        h.game_loop.process_frame(Instant::now());

        h.push(payload(true, false, false));
        let outcome = h.game_loop.process_frame(Instant::now());
        assert_eq!(outcome.events, vec![LifecycleEvent::TankKilled]);

        // Still dead next frame: nothing new, and no moves for a dead tank
        h.push(payload(true, false, false));
        let outcome = h.game_loop.process_frame(Instant::now());
        assert!(outcome.events.is_empty());

        let calls = h.agent.calls();
        assert_eq!(calls.iter().filter(|c| *c == "tank_killed").count(), 1);
        assert!(!calls.contains(&"round_over".to_string()));
        assert_eq!(calls.iter().filter(|c| *c == "make_move").count(), 1);
    }

    #[test]
    fn round_end_fires_round_over_and_stops_moves() {
        let mut h = Harness::new(RecordingAgent::default());
        h.push(payload(true, true, false));
        h.game_loop.process_frame(Instant::now());

        h.push(payload(false, true, false));
        let outcome = h.game_loop.process_frame(Instant::now());
        assert_eq!(outcome.events, vec![LifecycleEvent::RoundOver]);
        assert_eq!(outcome.commands_sent, 0);
        assert_eq!(h.agent.calls().last().map(String::as_str), Some("round_over"));
    }

    #[test]
    fn start_waits_for_first_message_and_stops_on_disconnect() {
        let h = Harness::new(RecordingAgent::default());
        let status = h.game_loop.status();
        let signals = h.signals.clone();
        let queue = h.queue.clone();
        assert_eq!(status.phase(), LoopPhase::Off);

        let mut game_loop = h.game_loop;
        let runner = thread::spawn(move || {
            game_loop.start();
            game_loop
        });

        wait_for(|| status.phase() == LoopPhase::Waiting);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(status.phase(), LoopPhase::Waiting);

        queue.push(Bytes::from(payload(true, true, false).to_string()));
        signals.mark_first_receive();
        wait_for(|| status.phase() == LoopPhase::Running);
        wait_for(|| queue.is_empty());

        signals.mark_disconnected();
        let game_loop = runner.join().unwrap();
        assert_eq!(status.phase(), LoopPhase::Off);
        assert!(game_loop.state().unwrap().is_round_active);
        assert!(h.agent.calls().contains(&"connected".to_string()));
    }

    #[test]
    fn start_returns_immediately_after_disconnect() {
        let mut h = Harness::new(RecordingAgent::default());
        h.signals.mark_disconnected();
        h.game_loop.start();
        assert_eq!(h.game_loop.status().phase(), LoopPhase::Off);
        assert!(h.agent.calls().is_empty());
    }

    #[test]
    fn stop_request_ends_a_running_loop() {
        let h = Harness::new(RecordingAgent::default());
        let status = h.game_loop.status();
        h.signals.mark_first_receive();

        let mut game_loop = h.game_loop;
        let runner = thread::spawn(move || game_loop.start());
        wait_for(|| status.phase() == LoopPhase::Running);

        status.request_stop();
        runner.join().unwrap();
        assert_eq!(status.phase(), LoopPhase::Off);
    }

    fn wait_for(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for condition");
            thread::sleep(Duration::from_millis(1));
        }
    }
}
