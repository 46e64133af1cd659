use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use prometheus::Gauge;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

use crate::metrics::RATE_LIMIT_CLIENTS;

// Key used when a request carries no peer address
pub const UNKNOWN_CLIENT: &str = "unknown";

// Rate limit entry - tracks requests per IP/key
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

impl RateLimitEntry {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }
}

/// A rejected request, with the time left until its window resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub retry_after_secs: u64,
}

/// Fixed-window request counter keyed by client identifier.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    max_requests: u32,
    window: Duration,
    // table size, refreshed on every sweep and insert
    clients: Gauge,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests,
            window,
            clients: RATE_LIMIT_CLIENTS.clone(),
        }
    }

    #[cfg(test)]
    fn with_gauge(mut self, clients: Gauge) -> Self {
        self.clients = clients;
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Counts one request from `client` at `now`.
    ///
    /// The read-modify-write happens under the shard lock of the client's
    /// entry, so concurrent calls for the same key never lose an increment.
    pub fn check(&self, client: &str, now: Instant) -> Result<(), RateLimited> {
        self.sweep(now);
        let result = self.count(client, now);
        // the shard guard is gone by now, len() locks every shard
        self.clients.set(self.entries.len() as f64);
        result
    }

    fn count(&self, client: &str, now: Instant) -> Result<(), RateLimited> {
        let mut entry = self
            .entries
            .entry(client.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: now,
            });

        // first request, or window expired? Reset it
        if entry.count == 0 || entry.is_expired(now, self.window) {
            *entry = RateLimitEntry::fresh(now);
            return Ok(());
        }

        if entry.count >= self.max_requests {
            let elapsed = now.saturating_duration_since(entry.window_start);
            let remaining = self.window.saturating_sub(elapsed);
            return Err(RateLimited {
                retry_after_secs: ceil_secs(remaining),
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Drops every entry whose window has expired. Returns how many went.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(now, self.window));
        let after = self.entries.len();
        self.clients.set(after as f64);
        before.saturating_sub(after)
    }

    #[cfg(test)]
    fn entry(&self, client: &str) -> Option<RateLimitEntry> {
        self.entries.get(client).map(|e| *e)
    }

    #[cfg(test)]
    fn contains(&self, client: &str) -> bool {
        self.entries.contains_key(client)
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
}

// Periodic sweep so idle clients do not pile up in the table
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(period);
        // the first tick completes immediately
        interval.tick().await;

        debug!("Rate limit sweeper started (interval: {:?})", period);
        loop {
            interval.tick().await;
            let evicted = limiter.sweep(Instant::now());
            if evicted > 0 {
                debug!(evicted, remaining = limiter.len(), "Swept stale rate limit entries");
            }
        }
    })
}
