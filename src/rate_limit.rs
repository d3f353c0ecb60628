use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::errors::AppError;
use crate::utils::{env_flag, env_u64};

/// Client keys tracked before stale entries are pruned.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window: Duration,
    /// Requests per client per window across the whole API.
    pub api_requests: u32,
    /// Login and registration attempts per client per window.
    pub auth_attempts: u32,
}

impl RateLimitConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let window_secs = env_u64("RATE_LIMIT_WINDOW_SECS", 900)?;
        if window_secs == 0 {
            return Err(AppError::configuration("RATE_LIMIT_WINDOW_SECS must be greater than zero"));
        }

        Ok(Self {
            enabled: env_flag("RATE_LIMIT_ENABLED", true)?,
            window: Duration::from_secs(window_secs),
            api_requests: env_limit("RATE_LIMIT_API_MAX", 100)?,
            auth_attempts: env_limit("RATE_LIMIT_AUTH_MAX", 5)?,
        })
    }
}

fn env_limit(name: &str, default: u32) -> Result<u32, AppError> {
    u32::try_from(env_u64(name, u64::from(default))?)
        .map_err(|_| AppError::configuration(format!("{name} is too large")))
}

type ClientLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Keyed token buckets, one per client address. The whole budget is
/// available at once and refills evenly over the window.
pub struct RateLimits {
    enabled: bool,
    api: ClientLimiter,
    auth: ClientLimiter,
}

impl RateLimits {
    pub fn new(config: RateLimitConfig) -> Result<Self, AppError> {
        Ok(Self {
            enabled: config.enabled,
            api: RateLimiter::keyed(quota(config.window, config.api_requests)?),
            auth: RateLimiter::keyed(quota(config.window, config.auth_attempts)?),
        })
    }

    fn admit(&self, limiter: &ClientLimiter, client: IpAddr, message: &str) -> Result<(), AppError> {
        if !self.enabled {
            return Ok(());
        }
        if limiter.len() > PRUNE_THRESHOLD {
            limiter.retain_recent();
        }
        if limiter.check_key(&client).is_err() {
            tracing::warn!(%client, "rate limit exceeded");
            return Err(AppError::too_many_requests(message));
        }
        Ok(())
    }
}

fn quota(window: Duration, max: u32) -> Result<Quota, AppError> {
    let burst = NonZeroU32::new(max).ok_or_else(|| AppError::configuration("rate limits must be at least 1"))?;
    Quota::with_period(window / max)
        .map(|quota| quota.allow_burst(burst))
        .ok_or_else(|| AppError::configuration("rate limit window is too short for its request budget"))
}

/// Requests without a peer address (in-process callers) share one bucket.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn limit_api(
    State(limits): State<Arc<RateLimits>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    limits.admit(
        &limits.api,
        client_ip(&request),
        "Too many requests from this IP, please try again later",
    )?;
    Ok(next.run(request).await)
}

pub async fn limit_auth(
    State(limits): State<Arc<RateLimits>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    limits.admit(
        &limits.auth,
        client_ip(&request),
        "Too many login attempts from this IP, please try again later",
    )?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(auth_attempts: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            window: Duration::from_secs(900),
            api_requests: 100,
            auth_attempts,
        }
    }

    #[test]
    fn budget_is_per_client() {
        let limits = RateLimits::new(config(2)).unwrap();
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let second = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limits.admit(&limits.auth, first, "slow down").is_ok());
        assert!(limits.admit(&limits.auth, first, "slow down").is_ok());
        assert!(matches!(
            limits.admit(&limits.auth, first, "slow down"),
            Err(AppError::TooManyRequests(_))
        ));
        assert!(limits.admit(&limits.auth, second, "slow down").is_ok());
    }

    #[test]
    fn disabled_limits_admit_everything() {
        let limits = RateLimits::new(RateLimitConfig { enabled: false, ..config(1) }).unwrap();
        let client = IpAddr::V4(Ipv4Addr::LOCALHOST);
        for _ in 0..10 {
            assert!(limits.admit(&limits.auth, client, "slow down").is_ok());
        }
    }

    #[test]
    fn zero_budget_is_a_configuration_error() {
        assert!(matches!(RateLimits::new(config(0)), Err(AppError::Configuration(_))));
    }
}
