// MinIO Rust Library for Amazon S3 Compatible Cloud Storage
// Copyright 2025 MinIO, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Retry budget and exponential backoff with full jitter

use crate::s3::error::{Operation, TransportError, ValidationErr};
use crate::s3::utils::duration_ms;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of attempts per request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Retry policy for gateway calls.
///
/// The delay before retry `n` (1-based) is drawn uniformly from
/// `[0, min(max_delay, base_delay * multiplier^(n-1))]` when `jitter` is set,
/// otherwise it is the upper bound itself.
///
/// # Example
///
/// ```
/// use minio_mpu::s3::multipart::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default()
///     .max_attempts(5)
///     .base_delay(Duration::from_millis(50));
/// assert_eq!(policy.delay_ceiling(1), Duration::from_millis(50));
/// assert_eq!(policy.delay_ceiling(3), Duration::from_millis(200));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts allowed per request, including the first one.
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    pub multiplier: f64,
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationErr> {
        if self.max_attempts == 0 || !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ValidationErr::InvalidRetryBudget);
        }
        Ok(())
    }

    /// Returns `true` if another attempt is allowed after `attempts_made` attempts.
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Upper bound of the delay before retry number `retry` (1-based).
    pub fn delay_ceiling(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let cap = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= cap {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Delay to wait before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let ceiling = self.delay_ceiling(retry);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }
        let nanos = ceiling.as_nanos().min(u64::MAX as u128) as u64;
        Duration::from_nanos(rand::rng().random_range(0..=nanos))
    }
}

/// Why a retried call gave up.
#[derive(Debug)]
pub(crate) enum RetryFailure {
    /// The last error was retryable but the budget ran out.
    Exhausted {
        error: TransportError,
        attempts: u32,
    },
    /// The service rejected the request.
    Permanent {
        error: TransportError,
        attempts: u32,
    },
    /// The cancellation token fired while waiting to retry.
    Cancelled,
}

/// Sleeps for `delay`, returning `false` if `cancel` fires first.
pub(crate) async fn sleep_unless_cancelled(
    delay: Duration,
    cancel: Option<&CancellationToken>,
) -> bool {
    match cancel {
        Some(token) => {
            if token.is_cancelled() {
                return false;
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}

/// Runs `call` until it succeeds, fails permanently or the policy's attempt
/// budget is spent. Cancellation is checked before each retry sleep.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: Operation,
    cancel: Option<&CancellationToken>,
    mut call: F,
) -> Result<(T, u32), RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        let error = match call().await {
            Ok(v) => return Ok((v, attempts)),
            Err(e) => e,
        };

        if !error.is_retryable() {
            log::warn!("{operation} failed permanently: {error}");
            return Err(RetryFailure::Permanent { error, attempts });
        }
        if !policy.allows_another(attempts) {
            log::warn!("{operation} failed after {attempts} attempts: {error}");
            return Err(RetryFailure::Exhausted { error, attempts });
        }

        let delay = policy.backoff(attempts);
        log::debug!("{operation} attempt {attempts} failed ({error}); retrying in {delay:?}");
        if !sleep_unless_cancelled(delay, cancel).await {
            return Err(RetryFailure::Cancelled);
        }
    }
}
