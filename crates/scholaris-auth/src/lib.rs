//! # Scholaris Auth
//!
//! JWT claims and token utilities for the Scholaris API.
//!
//! - **Access token** ([`Claims`]): short-lived, carries the role, the school
//!   scope and the permission list so handlers authorize without a lookup.
//! - **Refresh token** ([`RefreshTokenClaims`]): long-lived, only good for
//!   minting a new access token at `/api/auth/refresh`.
//!
//! # Example
//!
//! ```ignore
//! use scholaris_auth::{create_access_token, verify_token};
//! use scholaris_config::JwtConfig;
//! use scholaris_core::UserRole;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(user_id, "t@school.test", UserRole::Teacher, Some(school_id), &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.role, UserRole::Teacher);
//! ```

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::{Claims, RefreshTokenClaims};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
