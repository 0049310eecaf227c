use std::fmt;
use std::time::Duration;

use crate::constants::{FETCH_CADENCE_SECS, MIN_FETCH_DELAY_SECS};

/// Seconds until the next sample fetch, so it lands just after the server's
/// next cache refresh but never sooner than one second from now.
///
/// A server clock running ahead of ours never pushes the wait past one cadence.
pub fn next_fetch_delay(now: f64, last_server_fetch_time: f64) -> Duration {
    let since_last = now - last_server_fetch_time;
    let secs = (FETCH_CADENCE_SECS - since_last)
        .min(FETCH_CADENCE_SECS)
        .max(MIN_FETCH_DELAY_SECS);
    Duration::from_secs_f64(secs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    ScheduledFetch,
    Retry,
    Watchdog,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerKind::ScheduledFetch => "scheduled-fetch",
            TimerKind::Retry => "retry",
            TimerKind::Watchdog => "watchdog",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timer {
    pub id: TimerId,
    pub kind: TimerKind,
    /// Seconds since epoch
    pub deadline: f64,
}

/// One-shot timers, at most one armed per kind.
///
/// Arming a kind replaces whatever was armed for it before, so the number of
/// outstanding timers is bounded by the number of kinds. Ids are never reused.
#[derive(Debug, Default)]
pub struct Timers {
    next_id: u64,
    armed: Vec<Timer>,
}

impl Timers {
    pub fn arm(&mut self, kind: TimerKind, now: f64, delay: Duration) -> TimerId {
        self.cancel(kind);
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.armed.push(Timer {
            id,
            kind,
            deadline: now + delay.as_secs_f64(),
        });
        id
    }

    pub fn cancel(&mut self, kind: TimerKind) -> Option<Timer> {
        let pos = self.armed.iter().position(|t| t.kind == kind)?;
        Some(self.armed.swap_remove(pos))
    }

    #[cfg(test)]
    pub fn get(&self, kind: TimerKind) -> Option<&Timer> {
        self.armed.iter().find(|t| t.kind == kind)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.armed.iter().map(|t| t.deadline).reduce(f64::min)
    }

    /// Disarms and returns every timer whose deadline has passed, earliest first
    pub fn take_due(&mut self, now: f64) -> Vec<Timer> {
        let mut due: Vec<Timer> = self.armed.iter().filter(|t| t.deadline <= now).copied().collect();
        self.armed.retain(|t| t.deadline > now);
        due.sort_by(|a, b| a.deadline.total_cmp(&b.deadline).then(a.id.cmp(&b.id)));
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_targets_cadence_after_server_fetch() {
        let t = 1_700_000_000.0;
        assert_eq!(next_fetch_delay(t + 5.0, t), Duration::from_secs(25));
        assert_eq!(next_fetch_delay(t, t), Duration::from_secs(30));
    }

    #[test]
    fn delay_never_below_one_second() {
        let t = 1_700_000_000.0;
        assert_eq!(next_fetch_delay(t + 29.5, t), Duration::from_secs(1));
        assert_eq!(next_fetch_delay(t + 300.0, t), Duration::from_secs(1));
    }

    #[test]
    fn delay_capped_when_server_fetch_time_is_in_the_future() {
        let t = 1_700_000_000.0;
        assert_eq!(next_fetch_delay(t, t + 12.0), Duration::from_secs(30));
        assert_eq!(next_fetch_delay(t, 1e300), Duration::from_secs(30));
        assert_eq!(next_fetch_delay(t, f64::INFINITY), Duration::from_secs(30));
    }

    #[test]
    fn arming_same_kind_replaces_previous() {
        let mut timers = Timers::default();
        let first = timers.arm(TimerKind::ScheduledFetch, 0.0, Duration::from_secs(30));
        let second = timers.arm(TimerKind::ScheduledFetch, 0.0, Duration::from_secs(10));
        assert_ne!(first, second);
        assert_eq!(timers.len(), 1);
        let armed = timers.get(TimerKind::ScheduledFetch).unwrap();
        assert_eq!(armed.id, second);
        assert_eq!(armed.deadline, 10.0);
    }

    #[test]
    fn kinds_are_independent() {
        let mut timers = Timers::default();
        timers.arm(TimerKind::ScheduledFetch, 0.0, Duration::from_secs(30));
        timers.arm(TimerKind::Watchdog, 0.0, Duration::from_secs(40));
        timers.arm(TimerKind::Retry, 0.0, Duration::from_secs(5));
        assert_eq!(timers.len(), 3);
        assert_eq!(timers.next_deadline(), Some(5.0));

        let cancelled = timers.cancel(TimerKind::Retry).unwrap();
        assert_eq!(cancelled.kind, TimerKind::Retry);
        assert!(timers.cancel(TimerKind::Retry).is_none());
        assert_eq!(timers.next_deadline(), Some(30.0));
    }

    #[test]
    fn take_due_returns_expired_in_deadline_order() {
        let mut timers = Timers::default();
        timers.arm(TimerKind::Watchdog, 0.0, Duration::from_secs(40));
        timers.arm(TimerKind::ScheduledFetch, 0.0, Duration::from_secs(30));
        timers.arm(TimerKind::Retry, 0.0, Duration::from_secs(5));

        assert!(timers.take_due(4.0).is_empty());
        let due: Vec<TimerKind> = timers.take_due(35.0).iter().map(|t| t.kind).collect();
        assert_eq!(due, vec![TimerKind::Retry, TimerKind::ScheduledFetch]);
        assert_eq!(timers.len(), 1);
        assert!(timers.get(TimerKind::Watchdog).is_some());
    }
}
