//! Per-client request limiting for transports that serve the engine
//!
//! A [`RateLimiter`] is an owned value: a transport creates one, shares it
//! across requests, and tests create their own and call [`RateLimiter::reset`]
//! between runs. Nothing here is global.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Length of the sliding window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// A client exceeded its allowance for the current window.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rate limit exceeded. Max {limit} requests per minute.")]
pub struct RateLimited {
    pub limit: u32,
}

/// Sliding one-minute window of request timestamps per client.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// `limit` requests per client per minute; 0 disables limiting.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            requests: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Record a request from `client` if it is within the limit.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` when `client` already made `limit` requests in
    /// the last minute. Rejected requests are not recorded.
    pub fn check(&self, client: &str) -> Result<(), RateLimited> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), RateLimited> {
        if self.limit == 0 {
            return Ok(());
        }

        let mut requests = self.lock();
        requests.retain(|_, timestamps| {
            while timestamps
                .front()
                .is_some_and(|t| now.saturating_duration_since(*t) >= WINDOW)
            {
                timestamps.pop_front();
            }
            !timestamps.is_empty()
        });

        let timestamps = requests.entry(client.to_string()).or_default();
        if timestamps.len() >= self.limit as usize {
            tracing::debug!(client, limit = self.limit, "Rate limit exceeded");
            return Err(RateLimited { limit: self.limit });
        }
        timestamps.push_back(now);
        Ok(())
    }

    /// Forget every recorded request.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        // The map stays consistent even if a holder panicked
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
