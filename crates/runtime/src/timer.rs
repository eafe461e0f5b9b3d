use foundation::time::Millis;

/// Identifies one armed repeating timer.
///
/// Ids are never reused by a given timer source, so a tick carrying an old id
/// can always be told apart from the live one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// A source of repeating ticks.
///
/// Implementations deliver ticks out of band (a browser interval, a test
/// clock); the owner of the timer is told which id fired.
pub trait Timer {
    /// Starts a repeating timer with the given period.
    fn arm(&mut self, period_ms: u32) -> TimerId;

    /// Cancels a timer. Cancelling an unknown or already cancelled id is a no-op.
    fn cancel(&mut self, id: TimerId);

    /// Number of timers currently armed.
    fn live_count(&self) -> usize;

    /// Current time on this timer's timebase.
    fn now(&self) -> Millis;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Armed {
    id: TimerId,
    period_ms: u64,
    next_due: Millis,
}

/// Deterministic timer driven by explicit `advance` calls.
///
/// Firing order is `(due time, id)`, so replays are stable.
#[derive(Debug, Default)]
pub struct ManualTimer {
    now: Millis,
    next_id: u64,
    armed: Vec<Armed>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.armed.iter().any(|a| a.id == id)
    }

    pub fn period_of(&self, id: TimerId) -> Option<u32> {
        self.armed
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.period_ms as u32)
    }

    /// Moves time forward and returns the ids that fired, in order.
    pub fn advance(&mut self, ms: u64) -> Vec<TimerId> {
        let target = self.now.saturating_add(ms);
        let mut fired = Vec::new();
        loop {
            let next = self
                .armed
                .iter_mut()
                .filter(|a| a.next_due <= target)
                .min_by_key(|a| (a.next_due, a.id));
            let Some(armed) = next else {
                break;
            };
            self.now = armed.next_due;
            armed.next_due = armed.next_due.saturating_add(armed.period_ms);
            fired.push(armed.id);
        }
        self.now = target;
        fired
    }
}

impl Timer for ManualTimer {
    fn arm(&mut self, period_ms: u32) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let period_ms = u64::from(period_ms.max(1));
        self.armed.push(Armed {
            id,
            period_ms,
            next_due: self.now.saturating_add(period_ms),
        });
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.armed.retain(|a| a.id != id);
    }

    fn live_count(&self) -> usize {
        self.armed.len()
    }

    fn now(&self) -> Millis {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::{ManualTimer, Timer, TimerId};
    use foundation::time::Millis;

    #[test]
    fn fires_once_per_period() {
        let mut t = ManualTimer::new();
        let id = t.arm(1000);
        assert!(t.advance(999).is_empty());
        assert_eq!(t.advance(1), vec![id]);
        assert_eq!(t.advance(3000), vec![id, id, id]);
        assert_eq!(t.now(), Millis(4000));
    }

    #[test]
    fn cancel_stops_ticks_and_is_idempotent() {
        let mut t = ManualTimer::new();
        let id = t.arm(250);
        t.cancel(id);
        t.cancel(id);
        t.cancel(TimerId(99));
        assert_eq!(t.live_count(), 0);
        assert!(t.advance(10_000).is_empty());
    }

    #[test]
    fn ids_are_not_reused() {
        let mut t = ManualTimer::new();
        let a = t.arm(100);
        t.cancel(a);
        let b = t.arm(100);
        assert_ne!(a, b);
        assert!(!t.is_armed(a));
        assert_eq!(t.period_of(b), Some(100));
    }

    #[test]
    fn interleaves_timers_by_due_time() {
        let mut t = ManualTimer::new();
        let slow = t.arm(1000);
        let fast = t.arm(250);
        let fired = t.advance(1000);
        assert_eq!(fired, vec![fast, fast, fast, slow, fast]);
    }

    #[test]
    fn period_is_measured_from_arm_time() {
        let mut t = ManualTimer::new();
        t.advance(400);
        let id = t.arm(1000);
        assert!(t.advance(999).is_empty());
        assert_eq!(t.advance(1), vec![id]);
    }
}
