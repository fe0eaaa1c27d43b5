//! Rate Limiter (C6, §4.6).
//!
//! Referenced by the teacher's `server::websocket` as
//! `crate::rate_limit::RateLimiter`, constructed from `RateLimitConfig` and
//! wrapped in `Arc<tokio::sync::Mutex<RateLimiter>>` per connection — but
//! the module itself isn't in the retrieved set, so it is reconstructed
//! here: a `dashmap::DashMap<Key, TokenBucket>` per flavour (ip/user/
//! connection), each bucket refilled lazily on access rather than by a
//! ticking clock, plus a periodic sweep that evicts buckets idle past the
//! configured TTL.

use dashmap::DashMap;
use parking_lot::Mutex;
use pregnancy_config::RateLimitConfig;
use pregnancy_core::UserId;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_seen: Instant,
}

impl Bucket {
    fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self { tokens: capacity, capacity, refill_per_sec, last_seen: Instant::now() }
    }

    /// Lazily refill based on elapsed time, then try to take one token.
    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_seen).as_secs_f64();
        self.last_seen = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.duration_since(self.last_seen)
    }
}

/// Token-bucket rate limiter with three keyed flavours (§4.6): per-IP on
/// the HTTP surface, per-user on authenticated HTTP, per-connection on the
/// streaming chat transport. Each flavour gets its own bucket map so one
/// flavour's contention never blocks another's.
pub struct RateLimiter {
    config: RateLimitConfig,
    ip_buckets: DashMap<String, Mutex<Bucket>>,
    user_buckets: DashMap<UserId, Mutex<Bucket>>,
    connection_buckets: DashMap<String, Mutex<Bucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            ip_buckets: DashMap::new(),
            user_buckets: DashMap::new(),
            connection_buckets: DashMap::new(),
        }
    }

    /// Per-IP check (default 100 req/min, burst 200).
    pub fn check_ip(&self, ip: &str) -> bool {
        if !self.config.enabled {
            return true;
        }
        let refill = self.config.per_ip_per_min as f64 / 60.0;
        let capacity = self.config.per_ip_burst as f64;
        let bucket = self.ip_buckets.entry(ip.to_string()).or_insert_with(|| Mutex::new(Bucket::new(capacity, refill)));
        bucket.lock().try_acquire()
    }

    /// Per-user check (default 500 req/hour, burst 100).
    pub fn check_user(&self, user: &UserId) -> bool {
        if !self.config.enabled {
            return true;
        }
        let refill = self.config.per_user_per_hour as f64 / 3600.0;
        let capacity = self.config.per_user_burst as f64;
        let bucket = self.user_buckets.entry(user.clone()).or_insert_with(|| Mutex::new(Bucket::new(capacity, refill)));
        bucket.lock().try_acquire()
    }

    /// Per-connection check on the streaming chat transport (default 10
    /// msg/min — §9 open question 2: a config field, not a hardcoded
    /// constant).
    pub fn check_connection(&self, connection_id: &str) -> bool {
        if !self.config.enabled {
            return true;
        }
        let refill = self.config.per_connection_per_min as f64 / 60.0;
        let capacity = self.config.per_connection_per_min as f64;
        let bucket = self
            .connection_buckets
            .entry(connection_id.to_string())
            .or_insert_with(|| Mutex::new(Bucket::new(capacity, refill)));
        bucket.lock().try_acquire()
    }

    /// Evict buckets idle longer than `bucket_ttl_secs` (default 5 min),
    /// keeping every map's size bounded by recently-active keys.
    pub fn sweep(&self) {
        let ttl = Duration::from_secs(self.config.bucket_ttl_secs);
        let now = Instant::now();
        self.ip_buckets.retain(|_, bucket| bucket.lock().idle_for(now) < ttl);
        self.user_buckets.retain(|_, bucket| bucket.lock().idle_for(now) < ttl);
        self.connection_buckets.retain(|_, bucket| bucket.lock().idle_for(now) < ttl);
    }

    /// Spawn the background sweep task (§4.6, §9). Runs for the lifetime
    /// of the returned handle; dropping/aborting it stops the sweep.
    pub fn spawn_sweeper(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let period = Duration::from_secs(self.config.bucket_ttl_secs.max(1) / 2).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            per_ip_per_min: 60,
            per_ip_burst: 2,
            per_user_per_hour: 3600,
            per_user_burst: 2,
            per_connection_per_min: 2,
            bucket_ttl_secs: 300,
        }
    }

    #[test]
    fn allows_up_to_burst_then_denies() {
        let limiter = RateLimiter::new(config());
        assert!(limiter.check_ip("1.2.3.4"));
        assert!(limiter.check_ip("1.2.3.4"));
        assert!(!limiter.check_ip("1.2.3.4"));
    }

    #[test]
    fn different_ips_are_independent() {
        let limiter = RateLimiter::new(config());
        assert!(limiter.check_ip("1.1.1.1"));
        assert!(limiter.check_ip("1.1.1.1"));
        assert!(limiter.check_ip("2.2.2.2"));
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let mut cfg = config();
        cfg.enabled = false;
        let limiter = RateLimiter::new(cfg);
        for _ in 0..10 {
            assert!(limiter.check_connection("conn-1"));
        }
    }

    #[test]
    fn per_user_and_per_connection_are_independent_buckets() {
        let limiter = RateLimiter::new(config());
        let user = "u1".to_string();
        assert!(limiter.check_user(&user));
        assert!(limiter.check_user(&user));
        assert!(!limiter.check_user(&user));
        assert!(limiter.check_connection("conn-1"));
    }

    #[test]
    fn sweep_evicts_idle_buckets() {
        let mut cfg = config();
        cfg.bucket_ttl_secs = 0;
        let limiter = RateLimiter::new(cfg);
        limiter.check_ip("1.2.3.4");
        std::thread::sleep(Duration::from_millis(5));
        limiter.sweep();
        assert!(limiter.ip_buckets.is_empty());
    }
}
