//! Cancellable debounce timer for the typing-pause signal.
//!
//! Every keystroke announces TYPING_START and the content update
//! immediately; the pause signal is the only debounced emission. Each new
//! edit cancels the pending timer and schedules a fresh one, so at most
//! one TYPING_PAUSE fires per quiescent interval and none while actively
//! typing. Enforced at the sender — receivers just mirror.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::protocol::Frame;
use crate::sink::EventSink;

/// Quiescence window after the last edit before TYPING_PAUSE fires.
pub const PAUSE_DELAY: Duration = Duration::from_secs(1);

/// One-shot, restartable timer owned by the session.
#[derive(Debug)]
pub struct PauseTimer {
    delay: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PauseTimer {
    pub fn new() -> Self {
        Self::with_delay(PAUSE_DELAY)
    }

    /// Custom quiescence window (tests use short ones).
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            handle: None,
        }
    }

    /// Cancel any pending emission and schedule `frame` after the
    /// quiescence window. Requires a tokio runtime.
    pub fn restart<S: EventSink>(&mut self, sink: S, frame: Frame) {
        self.cancel();
        let delay = self.delay;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sink.emit(frame) {
                log::debug!("typing-pause emission dropped: {e}");
            }
        }));
    }

    /// Cancel the pending emission, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a pause emission is still scheduled.
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for PauseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PauseTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
