//! In-memory, two-tier, per-client rate limiting.
//!
//! Each client address gets a rolling-window counter across all endpoints
//! (the global tier) and one per endpoint path. A request is admitted only
//! when both tiers have room; rejected requests consume no quota. State
//! lives in this process only and is lost on restart.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::config::{RateLimitConfig, RateQuota};
use crate::error::ApiError;
use crate::state::AppState;

/// Timestamps of admitted requests within the current window, oldest first.
#[derive(Debug, Default)]
struct Window {
    hits: VecDeque<Instant>,
}

impl Window {
    fn prune(&mut self, quota: &RateQuota, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.duration_since(oldest) >= quota.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    fn has_room(&mut self, quota: &RateQuota, now: Instant) -> bool {
        self.prune(quota, now);
        (self.hits.len() as u32) < quota.count
    }

    fn record(&mut self, now: Instant) {
        self.hits.push_back(now);
    }
}

#[derive(Debug, Default)]
struct ClientWindows {
    global: Window,
    endpoints: HashMap<String, Window>,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<IpAddr, ClientWindows>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request from `ip` to `endpoint`. Both tiers are
    /// checked before either records the hit, so a rejection never burns
    /// quota in the other tier.
    pub fn check(&self, ip: IpAddr, endpoint: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap();
        let client = clients.entry(ip).or_default();

        let global_ok = client.global.has_room(&self.config.global, now);
        let endpoint_window = client.endpoints.entry(endpoint.to_string()).or_default();
        let endpoint_ok = endpoint_window.has_room(&self.config.per_endpoint, now);

        if global_ok && endpoint_ok {
            endpoint_window.record(now);
            client.global.record(now);
            true
        } else {
            false
        }
    }

    /// Drop clients whose windows have fully expired. Called periodically;
    /// without this the map grows with every address ever seen.
    pub fn remove_idle(&self) {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap();
        clients.retain(|_, client| {
            client.global.prune(&self.config.global, now);
            client
                .endpoints
                .retain(|_, w| {
                    w.prune(&self.config.per_endpoint, now);
                    !w.hits.is_empty()
                });
            !client.global.hits.is_empty() || !client.endpoints.is_empty()
        });
    }
}

/// Middleware applied ahead of every handler.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ip = client_ip(&req);
    let endpoint = req.uri().path().to_string();

    if state.limiter.check(ip, &endpoint) {
        next.run(req).await
    } else {
        warn!(%ip, %endpoint, "rate limit exceeded");
        ApiError::RateLimited.into_response()
    }
}

/// Proxy headers first, then the socket peer address. Requests with neither
/// (only really possible in tests driving the router directly) collapse onto
/// the loopback address.
fn client_ip(req: &Request) -> IpAddr {
    let from_header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    from_header("x-forwarded-for")
        .or_else(|| from_header("x-real-ip"))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limiter(global: RateQuota, per_endpoint: RateQuota) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            global,
            per_endpoint,
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    const MINUTE: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn eleventh_request_in_window_is_rejected() {
        let rl = limiter(
            RateQuota {
                count: 100,
                window: HOUR,
            },
            RateQuota {
                count: 10,
                window: MINUTE,
            },
        );

        for _ in 0..10 {
            assert!(rl.check(ip(1), "/api/auth"));
        }
        assert!(!rl.check(ip(1), "/api/auth"));
    }

    #[test]
    fn endpoints_are_limited_independently() {
        let rl = limiter(
            RateQuota {
                count: 100,
                window: HOUR,
            },
            RateQuota {
                count: 10,
                window: MINUTE,
            },
        );

        for _ in 0..10 {
            assert!(rl.check(ip(1), "/api/auth"));
        }
        assert!(!rl.check(ip(1), "/api/auth"));
        // a different endpoint still has its own headroom
        assert!(rl.check(ip(1), "/api/history"));
    }

    #[test]
    fn clients_are_limited_independently() {
        let rl = limiter(
            RateQuota {
                count: 100,
                window: HOUR,
            },
            RateQuota {
                count: 1,
                window: MINUTE,
            },
        );

        assert!(rl.check(ip(1), "/api/auth"));
        assert!(!rl.check(ip(1), "/api/auth"));
        assert!(rl.check(ip(2), "/api/auth"));
    }

    #[test]
    fn global_tier_caps_across_endpoints() {
        let rl = limiter(
            RateQuota {
                count: 3,
                window: HOUR,
            },
            RateQuota {
                count: 10,
                window: MINUTE,
            },
        );

        assert!(rl.check(ip(1), "/api/auth"));
        assert!(rl.check(ip(1), "/api/add_weight"));
        assert!(rl.check(ip(1), "/api/history"));
        assert!(!rl.check(ip(1), "/api/history"));
    }

    #[test]
    fn quota_returns_after_the_window_rolls() {
        let rl = limiter(
            RateQuota {
                count: 100,
                window: HOUR,
            },
            RateQuota {
                count: 2,
                window: Duration::from_millis(50),
            },
        );

        assert!(rl.check(ip(1), "/api/auth"));
        assert!(rl.check(ip(1), "/api/auth"));
        assert!(!rl.check(ip(1), "/api/auth"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(rl.check(ip(1), "/api/auth"));
    }

    #[test]
    fn rejected_requests_do_not_consume_quota() {
        let rl = limiter(
            RateQuota {
                count: 2,
                window: HOUR,
            },
            RateQuota {
                count: 1,
                window: MINUTE,
            },
        );

        assert!(rl.check(ip(1), "/api/auth"));
        // rejected on the endpoint tier; must not count against the global tier
        assert!(!rl.check(ip(1), "/api/auth"));
        assert!(rl.check(ip(1), "/api/history"));
    }

    #[test]
    fn idle_clients_are_swept() {
        let rl = limiter(
            RateQuota {
                count: 10,
                window: Duration::from_millis(10),
            },
            RateQuota {
                count: 10,
                window: Duration::from_millis(10),
            },
        );

        assert!(rl.check(ip(1), "/api/auth"));
        std::thread::sleep(Duration::from_millis(20));
        rl.remove_idle();
        assert!(rl.clients.lock().unwrap().is_empty());
    }
}
