//! Token creation and verification (HS256).

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use scholaris_config::JwtConfig;
use scholaris_core::{AppError, UserRole};

use crate::claims::{Claims, RefreshTokenClaims};

/// Expiry timestamp for a token issued at `now`, never earlier than `now`.
fn expires_at(now: usize, lifetime_secs: i64) -> usize {
    let lifetime = usize::try_from(lifetime_secs.max(0)).unwrap_or(usize::MAX);
    now.saturating_add(lifetime)
}

/// Issues an access token. The permission list is derived from `role`.
pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    role: UserRole,
    school_id: Option<Uuid>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        school_id,
        permissions: role.permissions().iter().map(|p| p.to_string()).collect(),
        exp: expires_at(now, jwt_config.access_token_expiry),
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

/// Checks signature and expiry of an access token.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token".to_string()))
}

pub fn create_refresh_token(
    user_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = RefreshTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expires_at(now, jwt_config.refresh_token_expiry),
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create refresh token: {}", e)))
}

pub fn verify_refresh_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<RefreshTokenClaims, AppError> {
    decode::<RefreshTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired refresh token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let config = config();
        let user_id = Uuid::new_v4();
        let school_id = Uuid::new_v4();

        let token = create_access_token(
            user_id,
            "teacher@school.test",
            UserRole::Teacher,
            Some(school_id),
            &config,
        )
        .unwrap();
        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, UserRole::Teacher);
        assert_eq!(claims.school_id, Some(school_id));
        assert!(claims.has_permission("notices:create"));
        assert!(!claims.has_permission("schools:create"));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expiry_never_wraps() {
        assert_eq!(expires_at(1_000, 60), 1_060);
        assert_eq!(expires_at(1_000, -3600), 1_000);
        assert_eq!(expires_at(usize::MAX - 1, 3600), usize::MAX);

        let config = JwtConfig {
            access_token_expiry: -3600,
            ..config()
        };
        let token = create_access_token(
            Uuid::new_v4(),
            "a@school.test",
            UserRole::Teacher,
            Some(Uuid::new_v4()),
            &config,
        )
        .unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.exp, claims.iat);
    }

    #[test]
    fn test_super_admin_token_has_no_school() {
        let config = config();
        let token = create_access_token(
            Uuid::new_v4(),
            "root@scholaris.test",
            UserRole::SuperAdmin,
            None,
            &config,
        )
        .unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert!(claims.school_id.is_none());
        assert!(claims.has_permission("schools:create"));
    }

    #[test]
    fn test_verify_rejects_garbage_and_wrong_secret() {
        let config = config();
        let err = verify_token("invalid-token", &config).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);

        let token = create_access_token(
            Uuid::new_v4(),
            "a@school.test",
            UserRole::Student,
            Some(Uuid::new_v4()),
            &config,
        )
        .unwrap();
        let other = JwtConfig {
            secret: "different-secret-key-at-least-32-characters".to_string(),
            ..config
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = config();
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "old@school.test".to_string(),
            role: UserRole::Parent,
            school_id: Some(Uuid::new_v4()),
            permissions: vec![],
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let config = config();
        let user_id = Uuid::new_v4();

        let token = create_refresh_token(user_id, "a@school.test", &config).unwrap();
        let claims = verify_refresh_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp - claims.iat, 604800);
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let config = config();
        let user_id = Uuid::new_v4();

        let access = create_access_token(
            user_id,
            "a@school.test",
            UserRole::Teacher,
            Some(Uuid::new_v4()),
            &config,
        )
        .unwrap();
        let refresh = create_refresh_token(user_id, "a@school.test", &config).unwrap();

        assert!(verify_refresh_token(&access, &config).is_err());
        assert!(verify_token(&refresh, &config).is_err());
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let config = config();
        let user_id = Uuid::new_v4();
        let first = create_refresh_token(user_id, "a@school.test", &config).unwrap();
        let second = create_refresh_token(user_id, "a@school.test", &config).unwrap();
        assert_ne!(first, second);
    }
}
