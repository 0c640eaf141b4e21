//! Broker keep-alive bookkeeping
//!
//! A ping goes out once half the keep-alive interval has passed without any
//! transmission; a ping left unanswered for a full interval means the broker
//! is gone. Time comes from the caller, so this runs on the same millisecond
//! tick as [`crate::schedule`].

/// What the session owner should do now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveAction {
    Idle,
    /// Send a ping
    Ping,
    /// The outstanding ping was never answered
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    period_ms: u64,
    last_send_ms: u64,
    ping_sent_ms: Option<u64>,
}

impl KeepAlive {
    /// `keep_alive_secs == 0` disables pings
    pub fn new(keep_alive_secs: u16) -> Self {
        Self {
            period_ms: u64::from(keep_alive_secs) * 1_000,
            last_send_ms: 0,
            ping_sent_ms: None,
        }
    }

    /// Start over for a fresh session established at `now_ms`
    pub fn restart(&mut self, now_ms: u64) {
        self.last_send_ms = now_ms;
        self.ping_sent_ms = None;
    }

    /// Anything was sent to the broker
    pub fn record_send(&mut self, now_ms: u64) {
        self.last_send_ms = now_ms;
    }

    pub fn record_ping(&mut self, now_ms: u64) {
        self.last_send_ms = now_ms;
        self.ping_sent_ms = Some(now_ms);
    }

    pub fn record_pong(&mut self) {
        self.ping_sent_ms = None;
    }

    pub fn check(&self, now_ms: u64) -> KeepAliveAction {
        if self.period_ms == 0 {
            return KeepAliveAction::Idle;
        }
        match self.ping_sent_ms {
            Some(sent) if now_ms.wrapping_sub(sent) >= self.period_ms => KeepAliveAction::Expired,
            Some(_) => KeepAliveAction::Idle,
            None if now_ms.wrapping_sub(self.last_send_ms) >= self.period_ms / 2 => {
                KeepAliveAction::Ping
            }
            None => KeepAliveAction::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_after_half_interval_of_silence() {
        let mut keep_alive = KeepAlive::new(15);
        keep_alive.restart(1_000);
        assert_eq!(keep_alive.check(8_499), KeepAliveAction::Idle);
        assert_eq!(keep_alive.check(8_500), KeepAliveAction::Ping);

        keep_alive.record_send(8_000);
        assert_eq!(keep_alive.check(15_499), KeepAliveAction::Idle);
        assert_eq!(keep_alive.check(15_500), KeepAliveAction::Ping);
    }

    #[test]
    fn test_unanswered_ping_expires() {
        let mut keep_alive = KeepAlive::new(15);
        keep_alive.record_ping(10_000);
        assert_eq!(keep_alive.check(24_999), KeepAliveAction::Idle);
        assert_eq!(keep_alive.check(25_000), KeepAliveAction::Expired);

        keep_alive.record_pong();
        assert_eq!(keep_alive.check(25_000), KeepAliveAction::Ping);
    }

    #[test]
    fn test_restart_forgets_outstanding_ping() {
        let mut keep_alive = KeepAlive::new(15);
        keep_alive.record_ping(10_000);
        keep_alive.restart(40_000);
        assert_eq!(keep_alive.check(40_000), KeepAliveAction::Idle);
    }

    #[test]
    fn test_disabled() {
        let keep_alive = KeepAlive::new(0);
        assert_eq!(keep_alive.check(u64::MAX), KeepAliveAction::Idle);
    }
}
