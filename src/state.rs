use std::sync::Arc;
use std::time::Duration;

use scholaris_config::rate_limit::KeyedLimiter;
use scholaris_config::{CorsConfig, JwtConfig, RateLimitConfig};
use sqlx::PgPool;

/// Token buckets shared by every clone of the state.
pub struct RateLimiters {
    pub general: KeyedLimiter,
    pub auth: KeyedLimiter,
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            general: config.general_limiter(),
            auth: config.auth_limiter(),
        }
    }

    /// Drops buckets that have refilled completely, so idle clients stop
    /// taking up memory.
    pub fn retain_recent(&self) {
        self.general.retain_recent();
        self.auth.retain_recent();
        self.general.shrink_to_fit();
        self.auth.shrink_to_fit();
    }

    pub fn tracked_keys(&self) -> usize {
        self.general.len() + self.auth.len()
    }

    /// Runs [`Self::retain_recent`] on a fixed interval for the life of the
    /// process.
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) {
        let limiters = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiters.retain_recent();
                tracing::debug!(keys = limiters.tracked_keys(), "Pruned idle rate limit buckets");
            }
        });
    }
}

impl std::fmt::Debug for RateLimiters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiters").finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub rate_limiters: Arc<RateLimiters>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        jwt_config: JwtConfig,
        cors_config: CorsConfig,
        rate_limit_config: RateLimitConfig,
    ) -> Self {
        let rate_limiters = Arc::new(RateLimiters::new(&rate_limit_config));
        Self {
            db,
            jwt_config,
            cors_config,
            rate_limit_config,
            rate_limiters,
        }
    }

    /// Builds the state from environment configuration around an existing pool.
    pub fn from_env(db: PgPool) -> Self {
        Self::new(
            db,
            JwtConfig::from_env(),
            CorsConfig::from_env(),
            RateLimitConfig::from_env(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_keys_are_evicted() {
        let config = RateLimitConfig {
            general_per_second: 1000,
            general_burst_size: 1,
            auth_per_second: 1000,
            auth_burst_size: 1,
            ..RateLimitConfig::default()
        };
        let limiters = RateLimiters::new(&config);

        for i in 0..500 {
            let key = format!("10.0.{}.{}", i / 256, i % 256);
            let _ = limiters.general.check_key(&key);
            let _ = limiters.auth.check_key(&key);
        }
        assert_eq!(limiters.tracked_keys(), 1000);

        std::thread::sleep(Duration::from_millis(50));
        limiters.retain_recent();
        assert_eq!(limiters.tracked_keys(), 0);
    }

    #[test]
    fn test_active_keys_survive_cleanup() {
        let config = RateLimitConfig {
            general_per_second: 1,
            general_burst_size: 5,
            ..RateLimitConfig::default()
        };
        let limiters = RateLimiters::new(&config);
        let key = "203.0.113.9".to_string();

        assert!(limiters.general.check_key(&key).is_ok());
        limiters.retain_recent();
        assert_eq!(limiters.general.len(), 1);
    }
}
