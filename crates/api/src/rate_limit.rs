//! Per-IP Request Limits
//!
//! GCRA quotas keyed on the peer address, configured under
//! `[server.rate_limit]` and applied only to the served router.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Limiter keyed on peer IP that reports quota in `x-ratelimit-*` headers
pub type PeerIpGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Request quota per client address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Apply the limiter to the served router
    pub enabled: bool,
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests allowed at once before the refill applies
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 20,
        }
    }
}

impl RateLimitConfig {
    /// Limiter switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Create a rate limiting governor config.
///
/// Keys on the peer IP, so the service must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`. Returns `None` when
/// the limiter is disabled or the quota is zero.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<PeerIpGovernorConfig>> {
    if !config.enabled {
        return None;
    }

    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.per_second, 1);
        assert_eq!(config.burst_size, 20);
    }

    #[test]
    fn test_create_governor_config() {
        assert!(create_governor_config(&RateLimitConfig::default()).is_some());
        assert!(create_governor_config(&RateLimitConfig::disabled()).is_none());
    }

    #[test]
    fn test_zero_quota_rejected() {
        let config = RateLimitConfig {
            burst_size: 0,
            ..Default::default()
        };
        assert!(create_governor_config(&config).is_none());
    }
}
