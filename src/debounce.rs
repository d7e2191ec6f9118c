use std::time::Duration;

use tokio::time::Instant;

/// Coalesces a burst of values into the last one, released once the input
/// has been quiet for `delay`.
///
/// Holds at most one pending value. The owner polls it from its event loop,
/// sleeping until [`deadline`](Self::deadline) in between.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms the debouncer with `value`, replacing whatever was pending and
    /// restarting the quiet period from `now`.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.delay, value));
    }

    /// Releases the pending value if its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now => self.pending.take().map(|(_, value)| value),
            _ => None,
        }
    }

    /// Drops the pending value, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// The earliest of several optional deadlines.
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearming_restarts_the_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(600));

        debouncer.schedule("a", start);
        debouncer.schedule("ab", start + Duration::from_millis(200));
        debouncer.schedule("abc", start + Duration::from_millis(400));

        assert_eq!(debouncer.poll(start + Duration::from_millis(700)), None);
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(1000)));
        assert_eq!(debouncer.poll(start + Duration::from_millis(1000)), Some("abc"));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn test_cancel_discards_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(350));
        debouncer.schedule(1, start);

        assert_eq!(debouncer.cancel(), Some(1));
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_earliest_skips_idle_streams() {
        let now = Instant::now();
        let later = now + Duration::from_millis(5);
        assert_eq!(earliest([None, Some(later), Some(now)]), Some(now));
        assert_eq!(earliest([None, None]), None);
    }
}
