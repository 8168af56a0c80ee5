//! JWT claim structures.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use scholaris_core::UserRole;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// School scope, `None` for super admins
    pub school_id: Option<Uuid>,
    /// Permission names granted by the role
    pub permissions: Vec<String>,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Refresh token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    /// Unique token id so two refresh tokens minted in the same second differ
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: UserRole, permissions: &[&str]) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            email: "someone@school.test".to_string(),
            role,
            school_id: Some(Uuid::new_v4()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: 1234567890,
            iat: 1234567800,
        }
    }

    #[test]
    fn test_role_serializes_in_snake_case() {
        let claims = claims(UserRole::SchoolAdmin, &[]);
        let serialized = serde_json::to_string(&claims).unwrap();
        assert!(serialized.contains(r#""role":"school_admin""#));
    }

    #[test]
    fn test_has_permission() {
        let claims = claims(UserRole::Teacher, &["notices:create", "exams:read"]);
        assert!(claims.has_permission("notices:create"));
        assert!(!claims.has_permission("schools:create"));
    }

    #[test]
    fn test_user_id_parses_sub() {
        let claims = claims(UserRole::Student, &[]);
        assert_eq!(claims.user_id().map(|id| id.to_string()), Some(claims.sub.clone()));

        let broken = Claims {
            sub: "not-a-uuid".to_string(),
            ..claims
        };
        assert!(broken.user_id().is_none());
    }
}
