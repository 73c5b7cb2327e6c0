//! Optimistic compare-and-swap updates for versioned records.

use crate::config::ConcurrencyConfig;
use crate::error::{Result, WorkPulseError};
use crate::models::WorkSession;
use log::{debug, warn};
use rand::Rng;
use std::thread;
use std::time::Duration;

/// A record carrying an optimistic concurrency token.
pub trait Versioned {
    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);
}

impl Versioned for WorkSession {
    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

/// Storage that can write a record only if its version is unchanged.
///
/// `write_if_version` must increment the stored version as part of the same
/// write and return false, without writing, when `expected_version` is stale.
pub trait VersionedStore<T: Versioned> {
    fn load(&self, id: &str) -> Result<T>;
    fn write_if_version(&self, next: &T, expected_version: i64) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct ConcurrencyGuard {
    max_attempts: u32,
    retry_delay_ms: u64,
    jitter_ms: u64,
}

impl Default for ConcurrencyGuard {
    fn default() -> Self {
        Self::from(&ConcurrencyConfig::default())
    }
}

impl From<&ConcurrencyConfig> for ConcurrencyGuard {
    fn from(config: &ConcurrencyConfig) -> Self {
        ConcurrencyGuard::new(config.max_attempts, config.retry_delay_ms, config.jitter_ms)
    }
}

impl ConcurrencyGuard {
    pub fn new(max_attempts: u32, retry_delay_ms: u64, jitter_ms: u64) -> Self {
        ConcurrencyGuard {
            max_attempts: max_attempts.max(1),
            retry_delay_ms,
            jitter_ms,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Read the record, compute its next state with `apply`, and write it
    /// back only if nobody else wrote in between. Conflicts are retried up to
    /// `max_attempts` times; errors from `apply` or the store end the loop
    /// immediately.
    ///
    /// Returns the record as written, carrying its new version.
    pub fn update<T, S, F>(&self, store: &S, id: &str, mut apply: F) -> Result<T>
    where
        T: Versioned,
        S: VersionedStore<T> + ?Sized,
        F: FnMut(&T) -> Result<T>,
    {
        for attempt in 1..=self.max_attempts {
            let current = store.load(id)?;
            let expected = current.version();
            let mut next = apply(&current)?;

            if store.write_if_version(&next, expected)? {
                next.set_version(expected + 1);
                if attempt > 1 {
                    debug!("Update of {} succeeded on attempt {}", id, attempt);
                }
                return Ok(next);
            }

            warn!(
                "Version conflict on {} (expected v{}), attempt {}/{}",
                id, expected, attempt, self.max_attempts
            );

            if attempt < self.max_attempts {
                thread::sleep(self.backoff());
            }
        }

        Err(WorkPulseError::concurrency(format!(
            "{} was modified concurrently; gave up after {} attempts",
            id, self.max_attempts
        )))
    }

    fn backoff(&self) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.retry_delay_ms + jitter)
    }
}
