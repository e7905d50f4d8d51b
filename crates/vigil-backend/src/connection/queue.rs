use std::collections::VecDeque;

use super::transport::Frame;

/// A frame waiting for the channel to come back.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueuedFrame {
    pub frame: Frame,
    /// Unix milliseconds at which the frame was queued.
    pub queued_at: u64,
}

/// Bounded FIFO of outbound frames. When full, the oldest frame is dropped.
#[derive(Debug)]
pub(crate) struct OutboundQueue {
    capacity: usize,
    frames: VecDeque<QueuedFrame>,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            frames: VecDeque::new(),
        }
    }

    /// Appends a frame, returning the frame evicted to make room, if any.
    pub fn push(&mut self, frame: QueuedFrame) -> Option<QueuedFrame> {
        let evicted = if self.frames.len() >= self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    /// Puts a frame back at the head after a failed flush.
    pub fn push_front(&mut self, frame: QueuedFrame) {
        self.frames.push_front(frame);
    }

    pub fn pop(&mut self) -> Option<QueuedFrame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
