//! The working-set lock and handle lifecycle counters.
//!
//! One [`WorkingSet`] per registry, behind a single `parking_lot::Mutex`.
//! Holding its guard is what serializes:
//!
//! - every resolution state transition,
//! - every read and write of an entry's cached handle slot,
//! - parent handle construction.
//!
//! The lock is not reentrant. Code running under it must never drop the last
//! reference of an [`InterfaceInfo`](crate::InterfaceInfo), since that drop
//! re-acquires the lock.

use std::sync::Weak;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::info::InfoInner;

/// State guarded by the working-set lock.
#[derive(Debug, Default)]
pub(crate) struct WorkingSet {
    /// Cached handle per entry, indexed by `EntryId`. The slot never keeps a
    /// handle alive; a dead `Weak` means "no live handle".
    pub(crate) infos: Vec<Weak<InfoInner>>,
}

/// Runtime options for a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Maintain [`InfoStats`] counters.
    pub track_stats: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self { track_stats: true }
    }
}

/// A snapshot of handle lifecycle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfoStats {
    /// Handles constructed so far.
    pub created: usize,
    /// Handles destroyed so far.
    pub destroyed: usize,
    /// Handles currently alive.
    pub live: usize,
    /// Highest value `live` has reached.
    pub peak: usize,
    /// Times the working-set lock was taken.
    pub lock_acquisitions: usize,
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    enabled: bool,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    live: AtomicUsize,
    peak: AtomicUsize,
    lock_acquisitions: AtomicUsize,
}

impl StatCounters {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub(crate) fn record_lock(&self) {
        if self.enabled {
            self.lock_acquisitions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_created(&self) {
        if self.enabled {
            self.created.fetch_add(1, Ordering::Relaxed);
            let live = self.live.fetch_add(1, Ordering::AcqRel) + 1;
            self.peak.fetch_max(live, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_destroyed(&self) {
        if self.enabled {
            self.destroyed.fetch_add(1, Ordering::Relaxed);
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
    }

    pub(crate) fn snapshot(&self) -> InfoStats {
        InfoStats {
            created: self.created.load(Ordering::Acquire),
            destroyed: self.destroyed.load(Ordering::Acquire),
            live: self.live.load(Ordering::Acquire),
            peak: self.peak.load(Ordering::Acquire),
            lock_acquisitions: self.lock_acquisitions.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_live_and_peak() {
        let stats = StatCounters::new(true);
        stats.record_created();
        stats.record_created();
        stats.record_destroyed();
        stats.record_created();
        stats.record_lock();

        let snap = stats.snapshot();
        assert_eq!(snap.created, 3);
        assert_eq!(snap.destroyed, 1);
        assert_eq!(snap.live, 2);
        assert_eq!(snap.peak, 2);
        assert_eq!(snap.lock_acquisitions, 1);
    }

    #[test]
    fn disabled_counters_stay_zero() {
        let stats = StatCounters::new(false);
        stats.record_created();
        stats.record_lock();
        assert_eq!(stats.snapshot(), InfoStats::default());
    }

    #[test]
    fn default_options_track_stats() {
        assert!(RegistryOptions::default().track_stats);
    }
}
