// ABOUTME: SMGP heartbeat tracking for long-running client sessions
// ABOUTME: Counts unanswered Active_Test probes and reports when the link is considered dead

use tracing::{debug, warn};

/// What the session should do on a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Send an Active_Test.
    Probe,
    /// Too many probes went unanswered; the session should exit.
    Exhausted,
}

/// Tracks Active_Test liveness for a Ready session.
///
/// The session owns the interval timer and calls [`Heartbeat::on_tick`] each
/// time it fires; every frame received from the peer counts as a reply and
/// calls [`Heartbeat::on_peer_reply`]. The counter is incremented before the
/// probe goes out, so with `max_attempts = 3` the fourth tick without any
/// reply returns [`Beat::Exhausted`] instead of probing again.
///
/// # Example
///
/// ```rust
/// use smgp::client::{Beat, Heartbeat};
///
/// let mut heartbeat = Heartbeat::new(2);
/// assert_eq!(heartbeat.on_tick(), Beat::Probe);
/// assert_eq!(heartbeat.on_tick(), Beat::Probe);
/// assert_eq!(heartbeat.on_tick(), Beat::Exhausted);
///
/// heartbeat.on_peer_reply();
/// assert_eq!(heartbeat.on_tick(), Beat::Probe);
/// ```
#[derive(Debug, Clone)]
pub struct Heartbeat {
    max_attempts: u32,
    unanswered: u32,
}

impl Heartbeat {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            unanswered: 0,
        }
    }

    /// Advance on a timer tick.
    pub fn on_tick(&mut self) -> Beat {
        self.unanswered += 1;
        if self.unanswered > self.max_attempts {
            warn!(
                unanswered = self.unanswered - 1,
                max_attempts = self.max_attempts,
                "Active_Test unanswered, giving up on connection"
            );
            return Beat::Exhausted;
        }

        debug!("Active_Test due (attempt {})", self.unanswered);
        Beat::Probe
    }

    /// Any frame from the peer proves the link is alive.
    pub fn on_peer_reply(&mut self) {
        self.unanswered = 0;
    }

    /// Forget unanswered probes, for a fresh connection.
    pub fn reset(&mut self) {
        self.unanswered = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_after_max_unanswered_probes() {
        let mut heartbeat = Heartbeat::new(3);
        for _ in 0..3 {
            assert_eq!(heartbeat.on_tick(), Beat::Probe);
        }
        assert_eq!(heartbeat.on_tick(), Beat::Exhausted);
        assert_eq!(heartbeat.on_tick(), Beat::Exhausted);
    }

    #[test]
    fn test_any_reply_resets_counter() {
        let mut heartbeat = Heartbeat::new(2);
        heartbeat.on_tick();
        heartbeat.on_tick();
        heartbeat.on_peer_reply();

        assert_eq!(heartbeat.on_tick(), Beat::Probe);
        assert_eq!(heartbeat.on_tick(), Beat::Probe);
        assert_eq!(heartbeat.on_tick(), Beat::Exhausted);
    }

    #[test]
    fn test_reset_forgets_unanswered_probes() {
        let mut heartbeat = Heartbeat::new(1);
        assert_eq!(heartbeat.on_tick(), Beat::Probe);
        heartbeat.reset();
        assert_eq!(heartbeat.on_tick(), Beat::Probe);
        assert_eq!(heartbeat.on_tick(), Beat::Exhausted);
    }
}
