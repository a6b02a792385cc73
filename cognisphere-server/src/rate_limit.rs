//! Per-IP request rate limiting.
//!
//! Sliding window over request timestamps, pruned on every check. Three
//! limiter instances with distinct thresholds cover general traffic, auth
//! endpoints, and chat endpoints.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    message: &'static str,
    entries: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
    last_cleanup: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, message: &'static str) -> Self {
        Self {
            max_requests,
            window,
            message,
            entries: Arc::new(Mutex::new(HashMap::new())),
            last_cleanup: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Record a request from `ip`, returning false when over the limit
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        self.maybe_cleanup(now);

        let mut entries = self.entries.lock();
        let timestamps = entries.entry(ip).or_default();

        if let Some(cutoff) = now.checked_sub(self.window) {
            timestamps.retain(|t| *t > cutoff);
        }

        if timestamps.len() >= self.max_requests {
            return false;
        }
        timestamps.push(now);
        true
    }

    /// Evict idle IPs at most once per window so the map cannot grow
    /// without bound.
    fn maybe_cleanup(&self, now: Instant) {
        let mut last = self.last_cleanup.lock();
        if now.duration_since(*last) <= self.window {
            return;
        }
        *last = now;
        drop(last);

        let Some(cutoff) = now.checked_sub(self.window) else {
            return;
        };
        let mut entries = self.entries.lock();
        entries.retain(|_, timestamps| {
            timestamps.retain(|t| *t > cutoff);
            !timestamps.is_empty()
        });
    }

    #[cfg(test)]
    fn tracked_ips(&self) -> usize {
        self.entries.lock().len()
    }
}

pub async fn enforce(
    State(limiter): State<RateLimiter>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.check(addr.ip()) {
        next.run(request).await
    } else {
        tracing::warn!(ip = %addr.ip(), "rate limit exceeded");
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({ "error": limiter.message() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[test]
    fn allows_up_to_the_limit_then_blocks() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60), "slow down");

        for _ in 0..3 {
            assert!(limiter.check(ip(1)));
        }
        assert!(!limiter.check(ip(1)));
    }

    #[test]
    fn limits_are_tracked_per_ip() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), "slow down");

        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        assert!(limiter.check(ip(2)));
    }

    #[test]
    fn window_expiry_frees_the_budget() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20), "slow down");

        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(ip(1)));
    }

    #[test]
    fn idle_ips_are_evicted_from_the_map() {
        let limiter = RateLimiter::new(5, Duration::from_millis(50), "slow down");

        for last in 1..=100 {
            assert!(limiter.check(ip(last)));
        }
        assert_eq!(limiter.tracked_ips(), 100);

        std::thread::sleep(Duration::from_millis(80));

        // The next check triggers cleanup; only the fresh IP survives.
        assert!(limiter.check(ip(101)));
        assert!(limiter.tracked_ips() <= 2);
    }
}
