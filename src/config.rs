use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// A request quota expressed as "count/period", e.g. `100/hour` or `10/minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    pub count: u32,
    pub window: Duration,
}

impl FromStr for RateQuota {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, period) = s
            .split_once('/')
            .ok_or_else(|| anyhow::anyhow!("rate quota must look like \"100/hour\", got {s:?}"))?;
        let count: u32 = count.trim().parse()?;
        let window = match period.trim() {
            "second" => Duration::from_secs(1),
            "minute" => Duration::from_secs(60),
            "hour" => Duration::from_secs(60 * 60),
            "day" => Duration::from_secs(60 * 60 * 24),
            other => anyhow::bail!("unknown rate period {other:?}"),
        };
        Ok(Self { count, window })
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Applied per client address across all endpoints.
    pub global: RateQuota,
    /// Applied per client address, independently for each endpoint.
    pub per_endpoint: RateQuota,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
}

const DEV_SECRET: &str = "dev-session-secret-change-me";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:weights.db".into());

        let secret = match std::env::var("SESSION_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!(
                    "SESSION_SECRET not set; using a development default. \
                     Session cookies will be forgeable by anyone who reads the source."
                );
                DEV_SECRET.into()
            }
        };

        let session = SessionConfig {
            secret,
            ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };

        let global: RateQuota = std::env::var("DEFAULT_RATE_LIMIT")
            .unwrap_or_else(|_| "100/hour".into())
            .parse()?;
        let per_endpoint: RateQuota = std::env::var("ENDPOINT_RATE_LIMIT")
            .unwrap_or_else(|_| "10/minute".into())
            .parse()?;

        Ok(Self {
            database_url,
            session,
            rate_limit: RateLimitConfig {
                global,
                per_endpoint,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quota_strings() {
        let q: RateQuota = "100/hour".parse().unwrap();
        assert_eq!(q.count, 100);
        assert_eq!(q.window, Duration::from_secs(3600));

        let q: RateQuota = "10/minute".parse().unwrap();
        assert_eq!(q.count, 10);
        assert_eq!(q.window, Duration::from_secs(60));

        let q: RateQuota = " 5 / second ".parse().unwrap();
        assert_eq!(q.count, 5);
        assert_eq!(q.window, Duration::from_secs(1));
    }

    #[test]
    fn rejects_malformed_quota_strings() {
        assert!("100".parse::<RateQuota>().is_err());
        assert!("ten/minute".parse::<RateQuota>().is_err());
        assert!("10/fortnight".parse::<RateQuota>().is_err());
    }
}
