//! Rate limiter for protecting the API from request floods
//!
//! Each client key gets a token bucket. A client that drains its bucket is
//! blocked for a cooldown period; the block is lifted lazily the next time
//! that client shows up, so no timer tasks are spawned.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::SharedClock;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Bucket capacity (requests allowed in a burst)
    pub burst: u32,
    /// Tokens added back per second
    pub refill_per_second: f64,
    /// How long a client stays blocked after draining its bucket
    pub cooldown: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            burst: 3,
            refill_per_second: 1.0,
            cooldown: Duration::seconds(60),
        }
    }
}

impl RateLimiterConfig {
    /// Create a new RateLimiterConfig from environment variables
    ///
    /// # Environment Variables
    /// - `RATE_LIMIT_BURST`: Bucket capacity (default: 3)
    /// - `RATE_LIMIT_PER_SECOND`: Refill rate (default: 1)
    /// - `RATE_LIMIT_DURATION`: Cooldown length (default: 60)
    /// - `RATE_LIMIT_TIME`: Cooldown unit, `second` or `minute` (default: second)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|b: &u32| *b > 0)
            .unwrap_or(defaults.burst);

        let refill_per_second = std::env::var("RATE_LIMIT_PER_SECOND")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|r: &f64| *r > 0.0)
            .unwrap_or(defaults.refill_per_second);

        let duration: i64 = match std::env::var("RATE_LIMIT_DURATION") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_DURATION must be a whole number"))?,
            Err(_) => 60,
        };

        if duration <= 0 {
            anyhow::bail!("RATE_LIMIT_DURATION must be positive, got {duration}");
        }

        let cooldown = match std::env::var("RATE_LIMIT_TIME").as_deref() {
            Ok("minute") => Duration::try_minutes(duration),
            _ => Duration::try_seconds(duration),
        }
        .ok_or_else(|| anyhow::anyhow!("RATE_LIMIT_DURATION is out of range"))?;

        Ok(Self {
            burst,
            refill_per_second,
            cooldown,
        })
    }
}

/// Rate limiter entry
#[derive(Debug)]
struct RateLimiterEntry {
    /// Tokens currently available
    tokens: f64,
    /// Last time tokens were refilled
    last_refill: DateTime<Utc>,
    /// Block expiration time
    blocked_until: Option<DateTime<Utc>>,
}

/// Rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    /// Rate limiter configuration
    config: RateLimiterConfig,
    /// Rate limiter entries
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
    clock: SharedClock,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig, clock: SharedClock) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Check if a client is allowed to make a request, consuming one token
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();
        let capacity = f64::from(self.config.burst);

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            tokens: capacity,
            last_refill: now,
            blocked_until: None,
        });

        // Check if block has expired
        if let Some(blocked_until) = entry.blocked_until {
            if now < blocked_until {
                return false;
            }
            entry.blocked_until = None;
            entry.tokens = capacity;
            entry.last_refill = now;
        }

        let elapsed = (now - entry.last_refill).num_milliseconds().max(0) as f64 / 1000.0;
        entry.tokens = (entry.tokens + elapsed * self.config.refill_per_second).min(capacity);
        entry.last_refill = now;

        if entry.tokens < 1.0 {
            entry.blocked_until = Some(now + self.config.cooldown);
            info!(
                "Blocked key {} for {} seconds",
                key,
                self.config.cooldown.num_seconds()
            );
            return false;
        }

        entry.tokens -= 1.0;
        true
    }

    /// Drop entries that are neither blocked nor holding a partly drained
    /// bucket, returning how many were removed
    ///
    /// Such an entry is indistinguishable from a client never seen before.
    pub async fn purge_idle(&self) -> usize {
        let now = self.clock.now();
        let capacity = f64::from(self.config.burst);
        let refill_per_second = self.config.refill_per_second;
        let mut entries = self.entries.lock().await;
        let before = entries.len();

        entries.retain(|_, entry| {
            if entry.blocked_until.is_some_and(|until| now < until) {
                return true;
            }
            let elapsed = (now - entry.last_refill).num_milliseconds().max(0) as f64 / 1000.0;
            entry.blocked_until.is_none() && entry.tokens + elapsed * refill_per_second < capacity
        });

        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} idle rate limiter entries", purged);
        }
        purged
    }

    /// Number of tracked client keys
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether `key` is currently serving a cooldown
    pub async fn is_blocked(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .lock()
            .await
            .get(key)
            .and_then(|entry| entry.blocked_until)
            .is_some_and(|until| now < until)
    }
}
