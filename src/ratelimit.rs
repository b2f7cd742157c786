//! Fixed-window rate limiter, keyed by an opaque string (typically a client IP).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

/// One window's worth of bookkeeping for a single key.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at_ms: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct WindowInfo {
    pub remaining: u32,
    pub reset_at_ms: i64,
}

/// Fixed-window counter rate limiter.
pub struct RateLimiter {
    window_ms: i64,
    max_requests: u32,
    windows: Arc<RwLock<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(window_ms: i64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Session-creation rate limiter per §4.2: 10 requests per 60-second window.
    pub fn for_session_creation() -> Self {
        Self::new(60_000, 10)
    }

    /// Returns `true` if the request is admitted under the key's window.
    pub async fn check(&self, key: &str) -> bool {
        let now = now_ms();
        let mut windows = self.windows.write().await;

        match windows.get_mut(key) {
            Some(window) if now <= window.reset_at_ms => {
                if window.count >= self.max_requests {
                    false
                } else {
                    window.count += 1;
                    true
                }
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at_ms: now + self.window_ms,
                    },
                );
                true
            }
        }
    }

    /// Read-only view of a key's current window, for building `Retry-After`
    /// and `X-RateLimit-Remaining` responses.
    pub async fn info(&self, key: &str) -> WindowInfo {
        let now = now_ms();
        let windows = self.windows.read().await;

        match windows.get(key) {
            Some(window) if now <= window.reset_at_ms => WindowInfo {
                remaining: self.max_requests.saturating_sub(window.count),
                reset_at_ms: window.reset_at_ms,
            },
            _ => WindowInfo {
                remaining: self.max_requests,
                reset_at_ms: now + self.window_ms,
            },
        }
    }

    /// Drop windows whose reset time has passed, bounding memory use.
    pub async fn sweep(&self) {
        let now = now_ms();
        let mut windows = self.windows.write().await;
        windows.retain(|_, window| window.reset_at_ms > now);
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Background task that periodically sweeps expired rate-limit windows.
pub async fn sweep_task(limiter: Arc<RateLimiter>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        limiter.sweep().await;
        tracing::debug!("swept expired rate-limit windows");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(60_000, 3);
        assert!(limiter.check("k").await);
        assert!(limiter.check("k").await);
        assert!(limiter.check("k").await);
        assert!(!limiter.check("k").await);

        let info = limiter.info("k").await;
        assert_eq!(info.remaining, 0);
    }

    #[tokio::test]
    async fn separate_keys_have_independent_windows() {
        let limiter = RateLimiter::new(60_000, 1);
        assert!(limiter.check("a").await);
        assert!(limiter.check("b").await);
        assert!(!limiter.check("a").await);
    }

    #[tokio::test]
    async fn fresh_window_reports_full_remaining() {
        let limiter = RateLimiter::new(60_000, 10);
        let info = limiter.info("unseen").await;
        assert_eq!(info.remaining, 10);
    }

    #[tokio::test]
    async fn sweep_drops_expired_windows() {
        let limiter = RateLimiter::new(0, 1);
        assert!(limiter.check("k").await);
        // window_ms = 0, so reset_at_ms is already in the past by the time we sweep.
        tokio::time::sleep(Duration::from_millis(5)).await;
        limiter.sweep().await;
        let info = limiter.info("k").await;
        assert_eq!(info.remaining, 1);
    }
}
