//! Rate limiting module
//!
//! Fixed-window request counters per client key. API routes are bounded to
//! 100 requests / 15 minutes and webhook routes to 60 / minute.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// One counting window per client key
#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

/// Fixed-window rate limiter
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// API route limits: 100 requests per 15 minutes
    pub fn for_api() -> Self {
        Self::new(100, Duration::minutes(15))
    }

    /// Webhook route limits: 60 requests per minute
    pub fn for_webhooks() -> Self {
        Self::new(60, Duration::minutes(1))
    }

    /// Records a request for `key`; returns false when the limit is hit
    pub fn check(&self, key: &str) -> bool {
        let now = Utc::now();
        let mut windows = self.windows.lock().unwrap();

        // Drop stale windows so abandoned keys cannot accumulate
        windows.retain(|_, w| now - w.started_at < self.window);

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

/// The two ingress limiter classes
pub struct RateLimits {
    pub api: RateLimiter,
    pub webhooks: RateLimiter,
}

impl RateLimits {
    pub fn new() -> Self {
        Self {
            api: RateLimiter::for_api(),
            webhooks: RateLimiter::for_webhooks(),
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_enforced() {
        let limiter = RateLimiter::new(3, Duration::minutes(1));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::minutes(1));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("5.6.7.8"));
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn test_window_expires() {
        let limiter = RateLimiter::new(1, Duration::zero());
        assert!(limiter.check("1.2.3.4"));
        // The zero-length window expires immediately
        assert!(limiter.check("1.2.3.4"));
    }
}
