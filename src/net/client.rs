//! Network client - connection ownership, inbound buffering and the outbound command path

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tracing::{debug, error, info, trace, warn};

use crate::ws::protocol::Command;
use crate::ws::transport::{FrameSender, Transport, TransportError, TransportHandler};

use super::queue::MessageQueue;

/// Session flags flipped by the transport callback context and read by the game loop
#[derive(Debug, Default)]
pub struct SessionSignals {
    connected: AtomicBool,
    first_received: AtomicBool,
    disconnected: AtomicBool,
}

impl SessionSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// True once the first server message has been queued
    pub fn has_received(&self) -> bool {
        self.first_received.load(Ordering::Acquire)
    }

    /// True once the connection has ended, for whatever reason
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    pub(crate) fn mark_connected(&self) {
        self.connected.store(true, Ordering::Release);
    }

    /// Returns true only for the call that flipped the flag
    pub(crate) fn mark_first_receive(&self) -> bool {
        !self.first_received.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
        self.disconnected.store(true, Ordering::Release);
    }
}

/// Errors from the outbound command path
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Cloneable handle that encodes commands and queues them on the single
/// ordered outbound path. Safe to use from any thread.
#[derive(Clone, Debug)]
pub struct CommandSender {
    frames: FrameSender,
}

impl CommandSender {
    pub fn new(frames: FrameSender) -> Self {
        Self { frames }
    }

    /// Queue `command` for delivery. Never blocks; delivery order equals call order.
    pub fn send(&self, command: &Command) -> Result<(), CommandError> {
        let json = command.to_json()?;
        debug!(action = command.action(), "Sending command");
        trace!(frame = %json, "Outbound command");
        self.frames.send_text(json)?;
        Ok(())
    }
}

/// Transport callback target. Runs on the runtime, never blocks on the loop.
struct Inbound {
    queue: Arc<MessageQueue>,
    signals: Arc<SessionSignals>,
}

impl TransportHandler for Inbound {
    fn on_open(&self) {
        info!("Connected to server");
        self.signals.mark_connected();
    }

    fn on_close(&self) {
        info!("Connection closed - shutting down");
        self.signals.mark_disconnected();
    }

    fn on_text_message(&self, payload: Bytes) {
        trace!(bytes = payload.len(), "Queueing server message");
        let depth = self.queue.push(payload);
        if self.signals.mark_first_receive() {
            info!("Received first game state");
        }
        if depth > 1 {
            trace!(depth, "Inbound backlog");
        }
    }

    fn on_error(&self, err: &TransportError) {
        if err.is_connect_failure() {
            error!(error = %err, "Could not connect to server");
        } else {
            warn!(error = %err, "Transport error");
        }
    }
}

/// Manages the connection to the game server, buffers game states, and sends commands
pub struct NetworkClient {
    endpoint: String,
    transport: Transport,
    inbound: Arc<Inbound>,
    commands: CommandSender,
    runtime: Handle,
}

impl NetworkClient {
    /// Create a client for `endpoint`. Callbacks will run on `runtime`.
    pub fn new(endpoint: impl Into<String>, runtime: Handle) -> Self {
        let transport = Transport::new();
        let commands = CommandSender::new(transport.sender());
        Self {
            endpoint: endpoint.into(),
            transport,
            inbound: Arc::new(Inbound {
                queue: Arc::new(MessageQueue::new()),
                signals: Arc::new(SessionSignals::new()),
            }),
            commands,
            runtime,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Begin connecting. Returns immediately; false if already started.
    pub fn start(&self) -> bool {
        let handler: Arc<dyn TransportHandler> = self.inbound.clone();
        self.transport.connect(&self.endpoint, handler, &self.runtime)
    }

    /// Close the connection. Idempotent.
    pub fn stop(&self) {
        self.transport.disconnect();
    }

    /// Encode and queue a command. Failures are logged, never returned.
    pub fn send(&self, command: &Command) {
        if let Err(e) = self.commands.send(command) {
            warn!(action = command.action(), error = %e, "Dropping command");
        }
    }

    /// Handle onto the ordered outbound path
    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    /// The inbound message queue
    pub fn queue(&self) -> Arc<MessageQueue> {
        self.inbound.queue.clone()
    }

    pub fn signals(&self) -> Arc<SessionSignals> {
        self.inbound.signals.clone()
    }

    /// Pop the oldest buffered server message
    pub fn pop_message(&self) -> Option<Bytes> {
        self.inbound.queue.pop()
    }
}
