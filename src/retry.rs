//! Retry logic module.
//!
//! Bounded retries with exponential backoff for transient infrastructure
//! failures: pool exhaustion, a busy SQLite file, and background jobs that
//! the queue contract says must be attempted a fixed number of times.

use crate::config;
use crate::error::{Result, WorkPulseError};
use log::debug;
use std::thread;
use std::time::Duration;

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Factor to multiply delay by after each attempt
    pub backoff_factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
        }
    }
}

impl From<&config::RetrySettings> for RetryConfig {
    fn from(settings: &config::RetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts.max(1),
            initial_delay_ms: settings.initial_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            backoff_factor: settings.backoff_factor,
        }
    }
}

impl RetryConfig {
    fn next_delay(&self, current: u64) -> u64 {
        ((current as f32 * self.backoff_factor) as u64).min(self.max_delay_ms)
    }
}

/// Check if an error is a transient infrastructure failure
pub fn is_retryable_error(error: &WorkPulseError) -> bool {
    match error {
        WorkPulseError::Io(_) => true,
        WorkPulseError::Pool(_) => true,
        WorkPulseError::Database(e) => {
            let error_string = e.to_string().to_lowercase();
            error_string.contains("busy")
                || error_string.contains("locked")
                || error_string.contains("timeout")
        }
        _ => false,
    }
}

/// Retry only if the error is retryable
pub fn retry_if_retryable<F, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    retry_when(config, is_retryable_error, operation)
}

/// Retry only infrastructure failures; errors caused by the input are
/// returned immediately
pub fn retry_system_errors<F, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    retry_when(config, WorkPulseError::is_system, operation)
}

fn retry_when<F, P, T>(config: &RetryConfig, should_retry: P, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
    P: Fn(&WorkPulseError) -> bool,
{
    let mut current_delay = config.initial_delay_ms;
    let mut last_error = None;

    for attempt in 1..=config.max_attempts {
        match operation() {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !should_retry(&e) {
                    return Err(e);
                }

                // Don't sleep after the last attempt
                if attempt < config.max_attempts {
                    debug!(
                        "Attempt {}/{} failed ({}), retrying in {}ms...",
                        attempt, config.max_attempts, e, current_delay
                    );

                    thread::sleep(Duration::from_millis(current_delay));
                    current_delay = config.next_delay(current_delay);
                }

                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| WorkPulseError::system("Retry failed with no error information")))
}
