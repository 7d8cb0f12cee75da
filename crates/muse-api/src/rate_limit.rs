//! Per-user request budgets for the like toggle and the two feed listings.
//!
//! Windows are fixed, not sliding: a user's count resets the first time they
//! call after `RATE_LIMIT_WINDOW_SECS` have passed. Both feed routes share one
//! budget. Rejections surface as 429 with `Retry-After` set to the rest of the
//! window, and the counters are reported by `/healthz`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use muse_core::util::user_fingerprint;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::AppError;

/// Fixed-window limiter keyed by endpoint and user.
#[derive(Clone)]
pub struct EndpointRateLimiter {
    state: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    like_limit: u32,
    feed_limit: u32,
    metrics: Arc<RateLimitMetrics>,
}

#[derive(Debug, Clone, Copy)]
pub enum ProtectedEndpoint {
    /// `POST /api/user/toggle-like-creations`
    ToggleLike,
    /// Both `GET` creation listings
    Feed,
}

#[derive(Default)]
struct RateLimitMetrics {
    like_allowed: AtomicU64,
    like_limited: AtomicU64,
    feed_allowed: AtomicU64,
    feed_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub like_allowed: u64,
    pub like_limited: u64,
    pub feed_allowed: u64,
    pub feed_limited: u64,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl EndpointRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_window,
            config.like_rate_limit_per_window,
            config.feed_rate_limit_per_window,
        )
    }

    fn new(window: Duration, like_limit: u32, feed_limit: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window,
            like_limit,
            feed_limit,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    pub async fn check(&self, endpoint: ProtectedEndpoint, user_id: &str) -> Result<(), AppError> {
        let limit = match endpoint {
            ProtectedEndpoint::ToggleLike => self.like_limit,
            ProtectedEndpoint::Feed => self.feed_limit,
        };

        let key = format!("{}:{user_id}", endpoint.label());
        let now = Instant::now();
        let mut guard = self.state.lock().await;
        let entry = guard.entry(key).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs();
            self.counters(endpoint).1.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                endpoint = endpoint.label(),
                user = user_fingerprint(user_id),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                format!("Rate limit exceeded for {}", endpoint.label()),
                retry_after_secs,
            ));
        }

        entry.count += 1;
        self.counters(endpoint).0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            like_allowed: self.metrics.like_allowed.load(Ordering::Relaxed),
            like_limited: self.metrics.like_limited.load(Ordering::Relaxed),
            feed_allowed: self.metrics.feed_allowed.load(Ordering::Relaxed),
            feed_limited: self.metrics.feed_limited.load(Ordering::Relaxed),
        }
    }

    /// (allowed, limited) counters for `endpoint`
    fn counters(&self, endpoint: ProtectedEndpoint) -> (&AtomicU64, &AtomicU64) {
        match endpoint {
            ProtectedEndpoint::ToggleLike => {
                (&self.metrics.like_allowed, &self.metrics.like_limited)
            }
            ProtectedEndpoint::Feed => (&self.metrics.feed_allowed, &self.metrics.feed_limited),
        }
    }
}

impl ProtectedEndpoint {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ToggleLike => "toggle_like",
            Self::Feed => "feed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_blocks_after_limit() {
        let limiter = EndpointRateLimiter::new(Duration::from_secs(60), 2, 5);

        limiter
            .check(ProtectedEndpoint::ToggleLike, "user-a")
            .await
            .unwrap();
        limiter
            .check(ProtectedEndpoint::ToggleLike, "user-a")
            .await
            .unwrap();

        let err = limiter
            .check(ProtectedEndpoint::ToggleLike, "user-a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_, secs) if secs <= 60));

        let metrics = limiter.metrics_snapshot();
        assert_eq!(metrics.like_allowed, 2);
        assert_eq!(metrics.like_limited, 1);
    }

    #[tokio::test]
    async fn window_rollover_restores_budget() {
        let limiter = EndpointRateLimiter::new(Duration::from_millis(20), 1, 1);

        limiter.check(ProtectedEndpoint::Feed, "user-a").await.unwrap();
        assert!(limiter.check(ProtectedEndpoint::Feed, "user-a").await.is_err());

        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.check(ProtectedEndpoint::Feed, "user-a").await.unwrap();
        assert_eq!(limiter.metrics_snapshot().feed_allowed, 2);
        assert_eq!(limiter.metrics_snapshot().feed_limited, 1);
    }

    #[tokio::test]
    async fn limits_are_per_user_and_per_endpoint() {
        let limiter = EndpointRateLimiter::new(Duration::from_secs(60), 1, 1);

        limiter
            .check(ProtectedEndpoint::ToggleLike, "user-a")
            .await
            .unwrap();
        limiter
            .check(ProtectedEndpoint::ToggleLike, "user-b")
            .await
            .unwrap();
        limiter
            .check(ProtectedEndpoint::Feed, "user-a")
            .await
            .unwrap();

        assert_eq!(limiter.metrics_snapshot().feed_allowed, 1);
        assert_eq!(limiter.metrics_snapshot().like_limited, 0);
    }
}
