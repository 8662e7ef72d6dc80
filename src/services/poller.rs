//! Status polling timer
//!
//! A `PollTimer` is bound to one `(analysis_id, status)` key. The session
//! replaces it whenever the key changes, so a timer never outlives the
//! analysis it was armed for.

use crate::model::analysis::AnalysisStatus;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollKey {
    pub analysis_id: String,
    pub status: AnalysisStatus,
}

#[derive(Debug)]
pub struct PollTimer {
    key: PollKey,
    interval: Duration,
    /// Set on the first check after arming
    next_due: Option<Instant>,
    fired: usize,
}

impl PollTimer {
    pub fn new(key: PollKey, interval: Duration) -> Self {
        Self {
            key,
            interval,
            next_due: None,
            fired: 0,
        }
    }

    pub fn key(&self) -> &PollKey {
        &self.key
    }

    pub fn fired(&self) -> usize {
        self.fired
    }

    /// Returns true when a poll should be issued at `now`
    ///
    /// The first call starts the interval; later calls fire at most once
    /// per interval.
    pub fn check(&mut self, now: Instant) -> bool {
        match self.next_due {
            None => {
                self.next_due = Some(now + self.interval);
                false
            }
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                self.fired += 1;
                true
            }
            Some(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PollKey {
        PollKey {
            analysis_id: "a1".to_string(),
            status: AnalysisStatus::Processing,
        }
    }

    #[test]
    fn test_first_check_arms_without_firing() {
        let mut timer = PollTimer::new(key(), Duration::from_secs(2));
        let t0 = Instant::now();
        assert!(!timer.check(t0));
        assert!(!timer.check(t0 + Duration::from_millis(1999)));
        assert!(timer.check(t0 + Duration::from_secs(2)));
        assert_eq!(timer.fired(), 1);
    }

    #[test]
    fn test_fires_once_per_interval() {
        let mut timer = PollTimer::new(key(), Duration::from_secs(2));
        let t0 = Instant::now();
        timer.check(t0);

        assert!(timer.check(t0 + Duration::from_secs(2)));
        assert!(!timer.check(t0 + Duration::from_secs(3)));
        assert!(timer.check(t0 + Duration::from_secs(4)));
        assert_eq!(timer.fired(), 2);
    }

    #[test]
    fn test_stalled_loop_does_not_burst() {
        let mut timer = PollTimer::new(key(), Duration::from_secs(2));
        let t0 = Instant::now();
        timer.check(t0);

        assert!(timer.check(t0 + Duration::from_secs(10)));
        assert!(!timer.check(t0 + Duration::from_secs(11)));
    }
}
