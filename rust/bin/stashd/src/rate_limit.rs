//! Fixed-window rate limiting per client address.
//!
//! One window is shared by the whole process. Every counter resets when the
//! window boundary passes, so a client that hit its quota gets a full quota
//! again at the next boundary.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use stash_core::{RateLimitConfig, ServiceError};
use tracing::warn;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

struct Window {
    started: Instant,
    // `None` collects requests whose peer address is unknown.
    hits: HashMap<Option<IpAddr>, u32>,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    fn starting_at(config: RateLimitConfig, started: Instant) -> Self {
        Self {
            config,
            window: Mutex::new(Window {
                started,
                hits: HashMap::new(),
            }),
        }
    }

    pub fn limit(&self) -> u32 {
        self.config.max_requests
    }

    /// Count one request from `client`.
    pub fn check(&self, client: Option<IpAddr>) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: Option<IpAddr>, now: Instant) -> Decision {
        let period = self.config.window;
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= period {
            // Jump to the boundary that contains `now`.
            let skipped = elapsed.as_nanos() / period.as_nanos();
            let started = window.started;
            window.started = u32::try_from(skipped)
                .ok()
                .and_then(|n| period.checked_mul(n))
                .and_then(|d| started.checked_add(d))
                .unwrap_or(now);
            window.hits.clear();
        }

        let hits = {
            let counter = window.hits.entry(client).or_insert(0);
            *counter = counter.saturating_add(1);
            *counter
        };

        if hits > self.config.max_requests {
            let resets_at = window.started + period;
            Decision::Limited {
                retry_after: resets_at.saturating_duration_since(now),
            }
        } else {
            Decision::Allowed {
                remaining: self.config.max_requests - hits,
            }
        }
    }
}

/// Middleware that enforces the quota before the request reaches a handler.
///
/// The client address comes from the connection's `ConnectInfo`.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match limiter.check(client) {
        Decision::Limited { retry_after } => {
            warn!(client = ?client, "rate limit exceeded");
            ServiceError::RateLimited { retry_after }.into_response()
        }
        Decision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.limit()));
            headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, secs: u64) -> (RateLimiter, Instant) {
        let start = Instant::now();
        let config = RateLimitConfig {
            window: Duration::from_secs(secs),
            max_requests,
        };
        (RateLimiter::starting_at(config, start), start)
    }

    fn ip(last: u8) -> Option<IpAddr> {
        Some(IpAddr::from([10, 0, 0, last]))
    }

    #[test]
    fn allows_up_to_quota_then_limits() {
        let (limiter, start) = limiter(3, 60);
        for expected in [2, 1, 0] {
            assert_eq!(
                limiter.check_at(ip(1), start),
                Decision::Allowed { remaining: expected }
            );
        }
        assert!(matches!(
            limiter.check_at(ip(1), start + Duration::from_secs(10)),
            Decision::Limited { retry_after } if retry_after == Duration::from_secs(50)
        ));
    }

    #[test]
    fn clients_are_counted_separately() {
        let (limiter, start) = limiter(1, 60);
        assert!(matches!(limiter.check_at(ip(1), start), Decision::Allowed { .. }));
        assert!(matches!(limiter.check_at(ip(1), start), Decision::Limited { .. }));
        assert!(matches!(limiter.check_at(ip(2), start), Decision::Allowed { .. }));
        assert!(matches!(limiter.check_at(None, start), Decision::Allowed { .. }));
    }

    #[test]
    fn quota_resumes_at_window_boundary() {
        let (limiter, start) = limiter(1, 60);
        assert!(matches!(limiter.check_at(ip(1), start), Decision::Allowed { .. }));
        assert!(matches!(
            limiter.check_at(ip(1), start + Duration::from_secs(59)),
            Decision::Limited { .. }
        ));
        assert_eq!(
            limiter.check_at(ip(1), start + Duration::from_secs(60)),
            Decision::Allowed { remaining: 0 }
        );
    }

    #[test]
    fn window_aligns_to_boundaries_after_idle_periods() {
        let (limiter, start) = limiter(1, 60);
        // Idle for several windows, then land 10s into the fourth one.
        let now = start + Duration::from_secs(190);
        assert!(matches!(limiter.check_at(ip(1), now), Decision::Allowed { .. }));
        assert!(matches!(
            limiter.check_at(ip(1), now),
            Decision::Limited { retry_after } if retry_after == Duration::from_secs(50)
        ));
    }
}
