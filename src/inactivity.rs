use std::time::Duration;

/// Countdown toward the automatic return to the idle screen.
///
/// Time is accumulated from tick deltas rather than read from a clock so the
/// tracker behaves identically under tests and at runtime.
#[derive(Debug, Clone)]
pub struct InactivityTracker {
    timeout: Duration,
    remaining: Duration,
    clock: Duration,
    last_interaction: Duration,
    expired: bool,
}

impl InactivityTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            remaining: timeout,
            clock: Duration::ZERO,
            last_interaction: Duration::ZERO,
            expired: false,
        }
    }

    /// Records an interaction and restores the full countdown.
    pub fn register_interaction(&mut self) {
        self.last_interaction = self.clock;
        self.rearm();
    }

    /// Restores the full countdown without recording an interaction.
    pub fn reset(&mut self) {
        self.rearm();
    }

    /// Advances the tracker clock. The countdown only runs while `enforcing`.
    ///
    /// Returns true on the tick the countdown reaches zero; further calls stay
    /// silent until the tracker is re-armed.
    pub fn advance(&mut self, dt: Duration, enforcing: bool) -> bool {
        self.clock = self.clock.saturating_add(dt);
        if !enforcing || self.expired {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining.is_zero() {
            self.expired = true;
            return true;
        }
        false
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn since_last_interaction(&self) -> Duration {
        self.clock.saturating_sub(self.last_interaction)
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    fn rearm(&mut self) {
        self.remaining = self.timeout;
        self.expired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    #[test]
    fn fires_once_when_countdown_reaches_zero() {
        let mut tracker = InactivityTracker::new(secs(10));
        assert!(!tracker.advance(secs(4), true));
        assert!(!tracker.advance(secs(5), true));
        assert!(tracker.advance(secs(1), true));
        assert!(!tracker.advance(secs(1), true));
        assert!(!tracker.advance(secs(100), true));
        assert!(tracker.is_expired());
    }

    #[test]
    fn interaction_restores_full_countdown() {
        let mut tracker = InactivityTracker::new(secs(10));
        tracker.advance(secs(9), true);
        tracker.register_interaction();
        assert_eq!(tracker.remaining(), secs(10));
        assert_eq!(tracker.since_last_interaction(), Duration::ZERO);
        assert!(!tracker.advance(secs(9), true));
        assert!(tracker.advance(secs(1), true));
        tracker.register_interaction();
        assert!(!tracker.is_expired());
    }

    #[test]
    fn countdown_is_suspended_when_not_enforcing() {
        let mut tracker = InactivityTracker::new(secs(5));
        assert!(!tracker.advance(secs(60), false));
        assert_eq!(tracker.remaining(), secs(5));
        assert_eq!(tracker.since_last_interaction(), secs(60));
    }

    #[test]
    fn reset_rearms_without_touching_interaction_time() {
        let mut tracker = InactivityTracker::new(secs(2));
        assert!(tracker.advance(secs(3), true));
        tracker.reset();
        assert_eq!(tracker.remaining(), secs(2));
        assert_eq!(tracker.since_last_interaction(), secs(3));
        assert!(tracker.advance(secs(2), true));
    }
}
