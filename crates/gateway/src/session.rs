//! Per-connection session fields shared by the reader and the heartbeat.

use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct SessionInner {
    session_id: Option<String>,
    sequence: Option<u64>,
}

/// Session id and last-seen sequence for the current connection.
///
/// Reset on every handshake and on disconnect. The sequence never moves backwards
/// within one session.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<SessionInner>,
}

impl SessionState {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sequence number from an inbound frame.
    /// Returns `false` (and keeps the current value) when `seq` is older.
    pub fn observe_sequence(&self, seq: u64) -> bool {
        let mut inner = self.inner.write();
        match inner.sequence {
            Some(current) if seq < current => {
                debug!(current, seq, "Ignoring stale sequence number");
                false
            }
            _ => {
                inner.sequence = Some(seq);
                true
            }
        }
    }

    /// Last-seen sequence, sent with each heartbeat.
    pub fn sequence(&self) -> Option<u64> {
        self.inner.read().sequence
    }

    /// Captures the session id from READY.
    pub fn set_session_id(&self, session_id: impl Into<String>) {
        self.inner.write().session_id = Some(session_id.into());
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.read().session_id.clone()
    }

    /// Discards all session fields.
    pub fn reset(&self) {
        *self.inner.write() = SessionInner::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_non_decreasing() {
        let session = SessionState::new();
        assert_eq!(session.sequence(), None);

        assert!(session.observe_sequence(3));
        assert!(session.observe_sequence(3));
        assert!(session.observe_sequence(5));
        assert!(!session.observe_sequence(4));
        assert_eq!(session.sequence(), Some(5));
    }

    #[test]
    fn reset_clears_session_and_sequence() {
        let session = SessionState::new();
        session.set_session_id("abc");
        session.observe_sequence(9);

        session.reset();
        assert_eq!(session.session_id(), None);
        assert_eq!(session.sequence(), None);
        assert!(session.observe_sequence(1));
    }
}
