//! Request extractors and middleware.
//!
//! - [`auth`]: bearer token extractor and one permission extractor per
//!   guarded operation
//! - [`rate_limit`]: per-client token buckets
//!
//! # Authentication Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. `AuthUser` verifies the JWT and exposes its claims
//! 3. A `RequireXxx` extractor checks the permission the handler needs
//! 4. The service applies tenant and ownership scoping
//!
//! ```ignore
//! use crate::middleware::auth::RequireNoticesCreate;
//!
//! async fn create_notice(
//!     RequireNoticesCreate(auth_user): RequireNoticesCreate,
//! ) -> impl IntoResponse {
//!     // only reached with the "notices:create" permission
//! }
//! ```

pub mod auth;
pub mod rate_limit;
