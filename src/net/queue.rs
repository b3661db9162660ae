//! Inbound message queue shared between the transport callback context and the game loop

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;

/// FIFO of raw server payloads. The newest message is at the tail.
///
/// Pushed by the transport's callback context and popped from the head by
/// the game loop. Every operation takes the lock once, so a message is never
/// observed twice or lost between a push and a pop.
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: Mutex<VecDeque<Bytes>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload at the tail. Returns the queue length after the push.
    pub fn push(&self, payload: Bytes) -> usize {
        let mut messages = self.messages.lock();
        messages.push_back(payload);
        messages.len()
    }

    /// Remove and return the oldest payload
    pub fn pop(&self) -> Option<Bytes> {
        self.messages.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}
