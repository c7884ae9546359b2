//! Drive activity indicator timing.
//!
//! A drive goes idle between every block it transfers. Forwarding each of
//! those transitions would make an indicator flicker, so the machine holds
//! the idle notification back until the drive has stayed quiet for the
//! configured timeout. New activity cancels the countdown.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ActivityTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl ActivityTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start or restart the countdown from `now`.
    pub fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_timeout() {
        let start = Instant::now();
        let mut timer = ActivityTimer::new(Duration::from_millis(500));
        timer.restart(start);
        assert!(!timer.poll(start + Duration::from_millis(499)));
        assert!(timer.poll(start + Duration::from_millis(500)));
        assert!(!timer.poll(start + Duration::from_millis(900)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_restart_pushes_deadline() {
        let start = Instant::now();
        let mut timer = ActivityTimer::new(Duration::from_millis(100));
        timer.restart(start);
        timer.restart(start + Duration::from_millis(80));
        assert!(!timer.poll(start + Duration::from_millis(150)));
        assert!(timer.poll(start + Duration::from_millis(180)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut timer = ActivityTimer::new(Duration::from_millis(10));
        timer.restart(start);
        timer.cancel();
        assert!(!timer.poll(start + Duration::from_secs(1)));
    }
}
