//! Fixed-window rate limiting for live analyst calls

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(15 * 60 * 1000);
pub const DEFAULT_MAX_REQUESTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            window: DEFAULT_WINDOW,
            max_requests: DEFAULT_MAX_REQUESTS,
        }
    }
}

#[derive(Debug, Clone)]
struct Window {
    started: Instant,
    count: u32,
}

/// Admits at most `max_requests` calls per key in each window
#[derive(Debug, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Same as [`RateLimiter::allow`] with an explicit clock reading
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        // A poisoned lock only means another caller panicked mid-update;
        // the counters are still usable.
        let mut lock = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = lock.entry(key.to_string()).or_insert_with(|| Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(window.started) >= self.config.window {
            window.started = now;
            window.count = 0;
        }
        if window.count < self.config.max_requests {
            window.count += 1;
            true
        } else {
            false
        }
    }

    /// Calls still admitted for `key` in the current window
    pub fn remaining_at(&self, key: &str, now: Instant) -> u32 {
        let lock = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        match lock.get(key) {
            Some(w) if now.saturating_duration_since(w.started) < self.config.window => {
                self.config.max_requests.saturating_sub(w.count)
            }
            _ => self.config.max_requests,
        }
    }
}
