//! WebSocket transport adapter
//!
//! Owns one long-lived duplex connection. `connect` returns immediately; every
//! lifecycle callback runs on the tokio runtime, never on the caller's thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use tracing::{debug, info, trace, warn};

/// Transport failures. None of these cross the public boundary as panics or
/// returned errors from `connect`; they are reported through [`TransportHandler::on_error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The server actively refused the connection
    #[error("connection to {endpoint} refused: {reason}")]
    ConnectRefused { endpoint: String, reason: String },

    /// The connection could not be established for another reason (DNS, handshake, ...)
    #[error("failed to connect to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    /// An established connection dropped
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Writing a frame to the socket failed
    #[error("send failed: {0}")]
    Send(String),

    /// The outbound path is gone because the connection already ended
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    fn from_connect(endpoint: &str, error: tungstenite::Error) -> Self {
        match &error {
            tungstenite::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
                TransportError::ConnectRefused {
                    endpoint: endpoint.to_string(),
                    reason: error.to_string(),
                }
            }
            _ => TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: error.to_string(),
            },
        }
    }

    /// True for errors raised before the connection was ever open
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectRefused { .. } | TransportError::ConnectFailed { .. }
        )
    }
}

/// Receives transport lifecycle callbacks on the runtime's callback context.
/// Implementations must not block.
pub trait TransportHandler: Send + Sync + 'static {
    fn on_open(&self);
    fn on_close(&self);
    fn on_text_message(&self, payload: Bytes);
    fn on_error(&self, error: &TransportError);
}

/// A frame queued for the writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Text(String),
    Close,
}

/// Cloneable handle onto the single ordered outbound path.
/// Frames are written in exactly the order they were queued.
#[derive(Clone, Debug)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl FrameSender {
    /// Create a sender with its receiving end, without a socket behind it
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a text frame. Never blocks.
    pub fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.tx
            .send(Outgoing::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    fn send_close(&self) -> Result<(), TransportError> {
        self.tx.send(Outgoing::Close).map_err(|_| TransportError::Closed)
    }
}

/// WebSocket connection wrapper
pub struct Transport {
    sender: FrameSender,
    pending: Mutex<Option<mpsc::UnboundedReceiver<Outgoing>>>,
    closed: AtomicBool,
}

impl Transport {
    pub fn new() -> Self {
        let (sender, rx) = FrameSender::channel();
        Self {
            sender,
            pending: Mutex::new(Some(rx)),
            closed: AtomicBool::new(false),
        }
    }

    /// Handle for queueing outbound frames. Frames queued before the
    /// connection opens are flushed once it does.
    pub fn sender(&self) -> FrameSender {
        self.sender.clone()
    }

    /// Start connecting to `endpoint` on `runtime`. Returns immediately.
    /// Returns false if this transport was already connected once.
    pub fn connect(
        &self,
        endpoint: &str,
        handler: Arc<dyn TransportHandler>,
        runtime: &Handle,
    ) -> bool {
        let Some(outgoing) = self.pending.lock().take() else {
            warn!(endpoint = %endpoint, "Transport already started, ignoring connect");
            return false;
        };

        info!(endpoint = %endpoint, "Connecting to server");
        runtime.spawn(run_connection(endpoint.to_string(), handler, outgoing));
        true
    }

    /// Close the connection. Safe to call repeatedly and from any thread.
    pub fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Closing transport");
        if self.sender.send_close().is_err() {
            debug!("Transport already closed");
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive one connection from handshake to close
async fn run_connection(
    endpoint: String,
    handler: Arc<dyn TransportHandler>,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
) {
    let socket = match connect_async(endpoint.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            handler.on_error(&TransportError::from_connect(&endpoint, e));
            handler.on_close();
            return;
        }
    };

    handler.on_open();

    let (mut ws_sink, mut ws_stream) = socket.split();
    let closing = Arc::new(Notify::new());

    // Writer task: outbound queue -> WebSocket, strictly in queue order
    let writer_handler = handler.clone();
    let writer_closing = closing.clone();
    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = outgoing.recv().await {
            match frame {
                Outgoing::Text(text) => {
                    trace!(frame = %text, "Sending frame");
                    if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                        writer_handler.on_error(&TransportError::Send(e.to_string()));
                        break;
                    }
                }
                Outgoing::Close => {
                    if let Err(e) = ws_sink.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not delivered");
                    }
                    break;
                }
            }
        }
        writer_closing.notify_one();
    });

    // Reader loop: WebSocket -> handler
    loop {
        let next = tokio::select! {
            next = ws_stream.next() => next,
            _ = closing.notified() => {
                debug!("Outbound path closed, ending session");
                break;
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                trace!(bytes = text.len(), "Received text frame");
                handler.on_text_message(Bytes::from(text));
            }
            Some(Ok(Message::Binary(data))) => {
                trace!(bytes = data.len(), "Received binary frame");
                handler.on_text_message(Bytes::from(data));
            }
            Some(Ok(Message::Ping(_))) => {
                trace!("Received ping");
            }
            Some(Ok(Message::Pong(_))) => {
                trace!("Received pong");
            }
            Some(Ok(Message::Close(frame))) => {
                debug!(frame = ?frame, "Server initiated close");
                break;
            }
            Some(Ok(Message::Frame(_))) => {}
            Some(Err(e)) => {
                handler.on_error(&TransportError::ConnectionLost(e.to_string()));
                break;
            }
            None => {
                debug!("WebSocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    handler.on_close();
}
