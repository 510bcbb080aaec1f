//! Tiered admission control
//!
//! Each identifier owns an [`AccessState`] behind its own mutex, so the
//! check-and-increment for one identifier is atomic while unrelated
//! identifiers never wait on each other. The outer map is a `DashMap`; its
//! shard lock is only held long enough to clone the state's `Arc`.
//!
//! Identifiers whose daily window has emptied are swept out of the map at
//! most once per [`SWEEP_INTERVAL`]; the store stays the source of truth, so
//! a swept identifier is rehydrated from it on its next request.

use crate::clock::{Clock, SystemClock};
use crate::store::{AccessStore, MemoryStore};
use crate::tier::Tier;
use crate::window::SlidingWindow;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use syntaxfix_core::{
    constants::{DAILY_WINDOW, HOURLY_WINDOW},
    duration_secs, Result,
};
use tracing::{debug, info};

/// Minimum time between sweeps of idle identifiers
pub const SWEEP_INTERVAL: Duration = HOURLY_WINDOW;

/// Which quota a denial hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitWindow {
    Daily,
    Hourly,
}

impl fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitWindow::Daily => f.write_str("daily"),
            LimitWindow::Hourly => f.write_str("hourly"),
        }
    }
}

/// Result of an admission check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Admission {
    Admitted {
        tier: Tier,
        used_daily: usize,
        used_hourly: usize,
        remaining_daily: usize,
        remaining_hourly: usize,
        features: Vec<String>,
    },
    Denied {
        tier: Tier,
        reason: String,
        window: LimitWindow,
        #[serde(rename = "retry_after_secs", with = "duration_secs")]
        retry_after: Duration,
        upgrade_available: bool,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Current usage for one identifier, without consuming quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub tier: Tier,
    pub used_daily: usize,
    pub used_hourly: usize,
    pub remaining_daily: usize,
    pub remaining_hourly: usize,
}

#[derive(Debug)]
struct AccessState {
    tier: Tier,
    daily: SlidingWindow,
    hourly: SlidingWindow,
}

impl AccessState {
    fn hydrate(tier: Tier, events: Vec<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let limits = tier.limits();
        let hourly_events: Vec<_> = events
            .iter()
            .copied()
            .filter(|at| within(*at, now, HOURLY_WINDOW))
            .collect();
        Self {
            tier,
            daily: SlidingWindow::from_events(DAILY_WINDOW, limits.fixes_per_day, events, now),
            hourly: SlidingWindow::from_events(
                HOURLY_WINDOW,
                limits.fixes_per_hour,
                hourly_events,
                now,
            ),
        }
    }

    /// Re-size windows when an identifier changes tier
    fn retier(&mut self, tier: Tier, now: DateTime<Utc>) {
        if self.tier == tier {
            return;
        }
        let events: Vec<_> = self.daily.events().copied().collect();
        *self = Self::hydrate(tier, events, now);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        self.daily.prune(now);
        self.hourly.prune(now);
    }

    fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            tier: self.tier,
            used_daily: self.daily.len(),
            used_hourly: self.hourly.len(),
            remaining_daily: self.daily.remaining(),
            remaining_hourly: self.hourly.remaining(),
        }
    }
}

fn within(at: DateTime<Utc>, now: DateTime<Utc>, span: Duration) -> bool {
    match (now - at).to_std() {
        Ok(age) => age < span,
        // Future timestamps count as current
        Err(_) => true,
    }
}

/// Per-identifier rate limiter backed by an [`AccessStore`]
#[derive(Debug, Clone)]
pub struct AccessController {
    states: Arc<DashMap<String, Arc<Mutex<AccessState>>>>,
    last_sweep: Arc<Mutex<Option<DateTime<Utc>>>>,
    store: Arc<dyn AccessStore>,
    clock: Arc<dyn Clock>,
}

impl Default for AccessController {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }
}

impl AccessController {
    pub fn new(store: Arc<dyn AccessStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            states: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(None)),
            store,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn AccessStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn state(&self, tier: Tier, identifier: &str, now: DateTime<Utc>) -> Result<Arc<Mutex<AccessState>>> {
        if let Some(state) = self.states.get(identifier) {
            return Ok(Arc::clone(state.value()));
        }

        // Read outside the map lock; a racing insert wins and ours is dropped
        let events = self.store.usage(identifier)?;
        let hydrated = Arc::new(Mutex::new(AccessState::hydrate(tier, events, now)));
        let state = self
            .states
            .entry(identifier.to_string())
            .or_insert(hydrated)
            .value()
            .clone();
        Ok(state)
    }

    /// Lock the state currently mapped to `identifier`
    ///
    /// A sweep can evict a state between lookup and lock; such a state is
    /// detached from the map, so look it up again.
    fn lock_state(
        &self,
        tier: Tier,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<ArcMutexGuard<RawMutex, AccessState>> {
        loop {
            let state = self.state(tier, identifier, now)?;
            let guard = state.lock_arc();
            let current = self
                .states
                .get(identifier)
                .is_some_and(|mapped| Arc::ptr_eq(mapped.value(), &state));
            if current {
                return Ok(guard);
            }
        }
    }

    /// Drop identifiers with nothing left in their daily window
    fn sweep_idle(&self, now: DateTime<Utc>) {
        {
            let mut last_sweep = self.last_sweep.lock();
            if last_sweep.is_some_and(|at| within(at, now, SWEEP_INTERVAL)) {
                return;
            }
            *last_sweep = Some(now);
        }

        let before = self.states.len();
        self.states.retain(|_, state| match state.try_lock() {
            Some(mut state) => {
                state.prune(now);
                !state.daily.is_empty()
            }
            // In use right now
            None => true,
        });
        let evicted = before.saturating_sub(self.states.len());
        if evicted > 0 {
            debug!(evicted, tracked = self.states.len(), "evicted idle identifiers");
        }
    }

    /// Check quotas for `identifier` and consume one request if allowed
    pub fn admit(&self, tier: Tier, identifier: &str) -> Result<Admission> {
        let now = self.clock.now();
        self.sweep_idle(now);
        let mut state = self.lock_state(tier, identifier, now)?;
        state.retier(tier, now);
        state.prune(now);

        let limits = tier.limits();

        if state.daily.is_full() {
            let retry_after = state.daily.retry_after(now);
            info!(
                identifier = %identifier,
                tier = %tier,
                retry_after_secs = retry_after.as_secs(),
                "daily limit reached"
            );
            return Ok(Admission::Denied {
                tier,
                reason: format!("daily limit reached ({} fixes/day)", limits.fixes_per_day),
                window: LimitWindow::Daily,
                retry_after,
                upgrade_available: tier.upgrade_available(),
            });
        }

        if state.hourly.is_full() {
            let retry_after = state.hourly.retry_after(now);
            info!(
                identifier = %identifier,
                tier = %tier,
                retry_after_secs = retry_after.as_secs(),
                "hourly limit reached"
            );
            return Ok(Admission::Denied {
                tier,
                reason: format!("hourly limit reached ({} fixes/hour)", limits.fixes_per_hour),
                window: LimitWindow::Hourly,
                retry_after,
                upgrade_available: tier.upgrade_available(),
            });
        }

        // Persist first so a failed write never leaves a phantom admission
        let cutoff = now - ChronoDuration::seconds(DAILY_WINDOW.as_secs() as i64);
        let expired = self.store.record_usage(identifier, now, cutoff)?;
        if expired > 0 {
            debug!(expired, "dropped expired usage entries");
        }

        state.daily.try_record(now);
        state.hourly.try_record(now);

        let usage = state.snapshot();
        debug!(
            identifier = %identifier,
            tier = %tier,
            remaining_daily = usage.remaining_daily,
            remaining_hourly = usage.remaining_hourly,
            "request admitted"
        );

        Ok(Admission::Admitted {
            tier,
            used_daily: usage.used_daily,
            used_hourly: usage.used_hourly,
            remaining_daily: usage.remaining_daily,
            remaining_hourly: usage.remaining_hourly,
            features: limits.features.iter().map(|f| f.to_string()).collect(),
        })
    }

    /// Usage for `identifier` as of now
    pub fn usage(&self, tier: Tier, identifier: &str) -> Result<UsageSnapshot> {
        let now = self.clock.now();
        self.sweep_idle(now);
        let mut state = self.lock_state(tier, identifier, now)?;
        state.retier(tier, now);
        state.prune(now);
        Ok(state.snapshot())
    }

    /// Number of identifiers with in-memory state
    pub fn tracked_identifiers(&self) -> usize {
        self.states.len()
    }
}
