//! Cache module for persisting the last fetched weather payload
//!
//! The cache holds exactly one record: the payload of the last successful fetch
//! and the UTC instant it was fetched. Every read path degrades to "no cache"
//! instead of failing, so an unreadable or corrupt file only ever costs a
//! refetch.

mod store;

use chrono::{DateTime, Utc};
use std::time::Duration;

pub use store::{CacheError, FileCache};

/// Storage contract used by the refresh scheduler
///
/// Only the scheduler reads or writes a cache store, and it does so from a
/// single task, so implementations need no internal synchronisation.
pub trait CacheStore {
    /// Returns the last stored payload verbatim, or `None` if nothing usable is stored
    fn read(&self) -> Option<Vec<u8>>;

    /// Returns when the stored payload was fetched, or `None` if missing or corrupt
    fn last_fetch_time(&self) -> Option<DateTime<Utc>>;

    /// Stores `payload` together with the current UTC time
    ///
    /// # Returns
    /// * `Ok(DateTime<Utc>)` - the timestamp recorded with the payload
    /// * `Err(CacheError)` - if the record could not be persisted
    fn write(&mut self, payload: &[u8]) -> Result<DateTime<Utc>, CacheError>;

    /// Checks freshness against an explicit instant
    ///
    /// True iff a payload exists, a timestamp exists and the payload is no
    /// older than `max_age` at `now`. A timestamp ahead of `now` counts as
    /// age zero.
    fn is_fresh_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let Some(fetched_at) = self.last_fetch_time() else {
            return false;
        };
        if self.read().is_none() {
            return false;
        }
        within_window(fetched_at, max_age, now)
    }

    /// Checks freshness against the current UTC time
    fn is_fresh(&self, max_age: Duration) -> bool {
        self.is_fresh_at(max_age, Utc::now())
    }
}

/// Whether `fetched_at` is no more than `max_age` before `now`
pub(crate) fn within_window(fetched_at: DateTime<Utc>, max_age: Duration, now: DateTime<Utc>) -> bool {
    // Negative ages (clock moved backwards) map to zero.
    let age = now
        .signed_duration_since(fetched_at)
        .to_std()
        .unwrap_or(Duration::ZERO);
    age <= max_age
}
