//! Per-address admission counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::LimiterConfig;

/// Tracks the open load (connections, in-flight requests) per source address.
///
/// Callers pair every [`increment`](Self::increment) with a
/// [`decrement`](Self::decrement). A count that goes negative means that
/// pairing broke somewhere; the counter reports it and keeps the value.
///
/// This struct is thread-safe and is meant to be shared behind an `Arc`.
pub struct AdmissionCounter {
    /// Load per address
    table: Mutex<HashMap<String, i64>>,
    /// Limiter settings, fixed at construction
    config: LimiterConfig,
    /// Decrements that drove a count below zero
    desync_events: AtomicU64,
    /// Completed resets, manual and timed
    resets: AtomicU64,
    /// When the table was last cleared
    last_reset: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time view of the counter, for logging and admin output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionStats {
    pub tracked_addresses: usize,
    pub desync_events: u64,
    pub resets: u64,
    pub last_reset: Option<DateTime<Utc>>,
}

impl AdmissionCounter {
    /// Create a counter. No reset timer runs until
    /// [`start_reset_timer`](Self::start_reset_timer) is called.
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            config,
            desync_events: AtomicU64::new(0),
            resets: AtomicU64::new(0),
            last_reset: Mutex::new(None),
        }
    }

    /// Create a counter with the given threshold and no reset interval.
    pub fn with_max(max: u64) -> Self {
        Self::new(LimiterConfig::new(max))
    }

    /// Add one unit of load for `address`. Absent addresses are ignored.
    pub fn increment(&self, address: Option<&str>) {
        let Some(address) = address else {
            return;
        };

        let mut table = self.table.lock();
        let count = table.entry(address.to_string()).or_insert(0);
        *count += 1;
        trace!(address = %address, count = *count, "Incremented admission count");
    }

    /// Remove one unit of load for `address`. Absent addresses are ignored.
    ///
    /// An address without an entry counts as zero, so an unpaired decrement
    /// leaves it at -1.
    pub fn decrement(&self, address: Option<&str>) {
        let Some(address) = address else {
            return;
        };

        let count = {
            let mut table = self.table.lock();
            let count = table.entry(address.to_string()).or_insert(0);
            *count -= 1;
            *count
        };

        if count < 0 {
            self.desync_events.fetch_add(1, Ordering::Relaxed);
            warn!(
                address = %address,
                count = count,
                "Admission count went negative; increment/decrement calls are out of sync"
            );
        } else {
            trace!(address = %address, count = count, "Decremented admission count");
        }
    }

    /// Whether `address` carries more load than the configured maximum.
    ///
    /// A count equal to the maximum is still admitted.
    pub fn is_limited(&self, address: Option<&str>) -> bool {
        let Some(address) = address else {
            return false;
        };

        let count = self.count(Some(address));
        let limited = count > 0 && count as u64 > self.config.max;
        if limited {
            debug!(address = %address, count = count, max = self.config.max, "Address is over its limit");
        }
        limited
    }

    /// Clear every entry in one swap.
    pub fn reset(&self) {
        let cleared = std::mem::take(&mut *self.table.lock());
        self.resets.fetch_add(1, Ordering::Relaxed);
        *self.last_reset.lock() = Some(Utc::now());
        debug!(cleared = cleared.len(), "Admission table reset");
    }

    /// Current count for `address`; zero when absent or untracked.
    pub fn count(&self, address: Option<&str>) -> i64 {
        address
            .and_then(|address| self.table.lock().get(address).copied())
            .unwrap_or(0)
    }

    /// Number of addresses with an entry in the table.
    pub fn tracked_addresses(&self) -> usize {
        self.table.lock().len()
    }

    /// The configured threshold.
    pub fn max(&self) -> u64 {
        self.config.max
    }

    /// The configured reset interval, if any.
    pub fn reset_interval(&self) -> Option<Duration> {
        self.config.reset_interval()
    }

    /// Snapshot of table size, desync events and reset history.
    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            tracked_addresses: self.tracked_addresses(),
            desync_events: self.desync_events.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            last_reset: *self.last_reset.lock(),
        }
    }
}

impl std::fmt::Debug for AdmissionCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionCounter")
            .field("config", &self.config)
            .field("tracked_addresses", &self.tracked_addresses())
            .finish()
    }
}
