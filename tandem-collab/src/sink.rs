//! Outbound connection boundary.
//!
//! The session never touches the WebSocket directly; it emits frames into
//! an [`EventSink`] injected at construction. The real sink is backed by
//! the client's writer task, tests inject a recording fake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::protocol::{Frame, ProtocolError};

/// Duplex-connection send half as seen by the session and the debounce
/// timer. `emit` must not block: implementations hand the frame to a
/// writer task.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, frame: Frame) -> Result<(), ProtocolError>;
    fn connected(&self) -> bool;
}

/// In-memory sink that records every emitted frame. Test support, also
/// useful as a null sink for offline sessions.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Frame>>,
    online: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.online.store(connected, Ordering::Relaxed);
    }

    /// Snapshot of everything emitted so far.
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn emitted_count(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut f) = self.frames.lock() {
            f.clear();
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, frame: Frame) -> Result<(), ProtocolError> {
        if !self.connected() {
            return Err(ProtocolError::ConnectionClosed);
        }
        self.frames
            .lock()
            .map_err(|_| ProtocolError::ConnectionClosed)?
            .push(frame);
        Ok(())
    }

    fn connected(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, frame: Frame) -> Result<(), ProtocolError> {
        (**self).emit(frame)
    }

    fn connected(&self) -> bool {
        (**self).connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RoomEvent;
    use uuid::Uuid;

    #[test]
    fn test_recording_sink_captures_frames() {
        let sink = RecordingSink::new();
        sink.emit(Frame::new(Uuid::new_v4(), RoomEvent::TypingPause))
            .unwrap();
        assert_eq!(sink.emitted_count(), 1);
        assert_eq!(sink.frames()[0].event, RoomEvent::TypingPause);
    }

    #[test]
    fn test_recording_sink_offline_rejects() {
        let sink = RecordingSink::new();
        sink.set_connected(false);
        assert!(!sink.connected());
        assert!(sink
            .emit(Frame::new(Uuid::new_v4(), RoomEvent::TypingPause))
            .is_err());
        assert_eq!(sink.emitted_count(), 0);
    }
}
