use crate::env_or;

const DEV_SECRET: &str = "scholaris-dev-secret-change-in-production";
const DEFAULT_ACCESS_EXPIRY: i64 = 3600; // 1 hour
const DEFAULT_REFRESH_EXPIRY: i64 = 604800; // 7 days

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_token_expiry: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry: i64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| DEV_SECRET.to_string()),
            access_token_expiry: positive_or(
                env_or("JWT_ACCESS_EXPIRY", DEFAULT_ACCESS_EXPIRY),
                DEFAULT_ACCESS_EXPIRY,
            ),
            refresh_token_expiry: positive_or(
                env_or("JWT_REFRESH_EXPIRY", DEFAULT_REFRESH_EXPIRY),
                DEFAULT_REFRESH_EXPIRY,
            ),
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret == DEV_SECRET
    }
}

/// Token lifetimes must be positive; anything else falls back to the default.
fn positive_or(seconds: i64, default: i64) -> i64 {
    if seconds > 0 { seconds } else { default }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_expiry_falls_back_to_default() {
        assert_eq!(positive_or(900, DEFAULT_ACCESS_EXPIRY), 900);
        assert_eq!(positive_or(0, DEFAULT_ACCESS_EXPIRY), DEFAULT_ACCESS_EXPIRY);
        assert_eq!(positive_or(-60, DEFAULT_REFRESH_EXPIRY), DEFAULT_REFRESH_EXPIRY);
    }
}
