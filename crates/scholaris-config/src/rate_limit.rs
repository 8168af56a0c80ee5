//! Rate limiting configuration for API endpoints.
//!
//! Limits are token buckets kept per client key (the caller's IP address) by
//! the `governor` crate. Authentication routes get their own, stricter bucket.
//!
//! # Configuration
//!
//! - `RATE_LIMIT_ENABLED`: Set to `false` to disable limiting (default: true)
//! - `RATE_LIMIT_GENERAL_PER_SECOND`: Token refill rate for general endpoints (default: 10)
//! - `RATE_LIMIT_GENERAL_BURST_SIZE`: Bucket size for general endpoints (default: 50)
//! - `RATE_LIMIT_AUTH_PER_SECOND`: Token refill rate for `/api/auth` (default: 1)
//! - `RATE_LIMIT_AUTH_BURST_SIZE`: Bucket size for `/api/auth` (default: 5)
//!
//! # Example
//!
//! ```ignore
//! use scholaris_config::RateLimitConfig;
//!
//! let config = RateLimitConfig::from_env();
//! let limiter = config.auth_limiter();
//! if limiter.check_key(&"203.0.113.7".to_string()).is_err() {
//!     // reject with 429
//! }
//! ```

use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::env_or;

/// Per-client rate limiter keyed by IP address string.
pub type KeyedLimiter = DefaultKeyedRateLimiter<String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub general_per_second: u32,
    pub general_burst_size: u32,
    pub auth_per_second: u32,
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general_per_second: 10,
            general_burst_size: 50,
            auth_per_second: 1,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    /// Loads limits from the environment, keeping defaults for anything unset
    /// or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("RATE_LIMIT_ENABLED", defaults.enabled),
            general_per_second: env_or("RATE_LIMIT_GENERAL_PER_SECOND", defaults.general_per_second),
            general_burst_size: env_or("RATE_LIMIT_GENERAL_BURST_SIZE", defaults.general_burst_size),
            auth_per_second: env_or("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: env_or("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
        }
    }

    /// Limits high enough that tests never trip them.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            enabled: false,
            general_per_second: 10_000,
            general_burst_size: 10_000,
            auth_per_second: 10_000,
            auth_burst_size: 10_000,
        }
    }

    #[must_use]
    pub fn general_quota(&self) -> Quota {
        quota(self.general_per_second, self.general_burst_size)
    }

    #[must_use]
    pub fn auth_quota(&self) -> Quota {
        quota(self.auth_per_second, self.auth_burst_size)
    }

    #[must_use]
    pub fn general_limiter(&self) -> KeyedLimiter {
        RateLimiter::keyed(self.general_quota())
    }

    #[must_use]
    pub fn auth_limiter(&self) -> KeyedLimiter {
        RateLimiter::keyed(self.auth_quota())
    }
}

/// Zero values are bumped to one; governor quotas cannot be empty.
fn quota(per_second: u32, burst: u32) -> Quota {
    let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(rate).allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.general_per_second, 10);
        assert_eq!(config.general_burst_size, 50);
        assert_eq!(config.auth_per_second, 1);
        assert_eq!(config.auth_burst_size, 5);
    }

    #[test]
    fn test_quota_burst() {
        let config = RateLimitConfig {
            auth_burst_size: 3,
            ..RateLimitConfig::default()
        };
        assert_eq!(config.auth_quota().burst_size().get(), 3);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let q = quota(0, 0);
        assert_eq!(q.burst_size().get(), 1);
    }

    #[test]
    fn test_auth_limiter_rejects_after_burst() {
        let config = RateLimitConfig {
            auth_per_second: 1,
            auth_burst_size: 2,
            ..RateLimitConfig::default()
        };
        let limiter = config.auth_limiter();
        let key = "198.51.100.1".to_string();

        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_err());

        // other clients have their own bucket
        assert!(limiter.check_key(&"198.51.100.2".to_string()).is_ok());
    }
}
