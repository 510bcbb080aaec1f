//! Rolling usage windows
//!
//! A window holds the timestamps of admitted requests inside a fixed span of
//! time. Capacity equals the quota, so a full window is a denial and the
//! buffer never grows past it. The buffer grows on demand up to that cap.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    span: Duration,
    capacity: usize,
    events: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    pub fn new(span: Duration, capacity: usize) -> Self {
        Self {
            span,
            capacity,
            events: VecDeque::new(),
        }
    }

    /// Rebuild from stored timestamps, keeping the newest `capacity` of them
    pub fn from_events<I>(span: Duration, capacity: usize, events: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut sorted: Vec<_> = events.into_iter().collect();
        sorted.sort_unstable();
        let skip = sorted.len().saturating_sub(capacity);

        let mut window = Self::new(span, capacity);
        window.events = sorted.into_iter().skip(skip).collect();
        window.prune(now);
        window
    }

    /// Drop events older than the span
    pub fn prune(&mut self, now: DateTime<Utc>) {
        while let Some(oldest) = self.events.front() {
            if elapsed(*oldest, now) >= self.span {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.events.len())
    }

    /// Append `now` if there is room
    pub fn try_record(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_full() {
            return false;
        }
        self.events.push_back(now);
        true
    }

    /// Time until the oldest event leaves the window
    pub fn retry_after(&self, now: DateTime<Utc>) -> Duration {
        match self.events.front() {
            Some(oldest) => self.span.saturating_sub(elapsed(*oldest, now)),
            None => Duration::ZERO,
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.events.iter()
    }
}

fn elapsed(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - earlier).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_capacity_bounds_admissions() {
        let mut window = SlidingWindow::new(Duration::from_secs(3600), 2);
        assert!(window.try_record(t(0)));
        assert!(window.try_record(t(1)));
        assert!(!window.try_record(t(2)));
        assert_eq!(window.len(), 2);
        assert_eq!(window.remaining(), 0);
    }

    #[test]
    fn test_large_quota_allocates_on_demand() {
        let mut window = SlidingWindow::new(Duration::from_secs(86_400), 50_000);
        assert!(window.events.capacity() < 50_000);
        window.try_record(t(0));
        assert_eq!(window.remaining(), 49_999);
    }

    #[test]
    fn test_prune_and_retry_after() {
        let mut window = SlidingWindow::new(Duration::from_secs(3600), 2);
        window.try_record(t(0));
        window.try_record(t(600));

        assert_eq!(window.retry_after(t(1200)), Duration::from_secs(2400));

        window.prune(t(3600));
        assert_eq!(window.len(), 1);
        assert!(window.try_record(t(3600)));
    }

    #[test]
    fn test_from_events_keeps_newest() {
        let window = SlidingWindow::from_events(
            Duration::from_secs(86_400),
            2,
            vec![t(30), t(10), t(20), t(-90_000)],
            t(100),
        );
        let kept: Vec<_> = window.events().copied().collect();
        assert_eq!(kept, vec![t(20), t(30)]);
    }
}
