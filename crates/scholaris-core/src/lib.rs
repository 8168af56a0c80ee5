//! # Scholaris Core
//!
//! Core types, errors, and utilities for the Scholaris API.
//!
//! This crate provides foundational types used throughout the Scholaris application:
//!
//! - [`errors`]: Application error types with HTTP response conversion
//! - [`pagination`]: Page-based pagination for listing endpoints
//! - [`password`]: Secure password hashing and verification
//! - [`permissions`]: Permission name constants
//! - [`roles`]: The five user roles and the permissions each one grants
//! - [`serde`]: Custom serde deserialization helpers for query strings
//!
//! # Example
//!
//! ```ignore
//! use scholaris_core::errors::AppError;
//! use scholaris_core::pagination::{PaginationParams, PaginationMeta};
//! use scholaris_core::password::{hash_password, verify_password};
//!
//! // Create an error
//! let error = AppError::not_found(anyhow::anyhow!("Notice not found"));
//!
//! // Hash a password
//! let hash = hash_password("secure_password")?;
//!
//! // Build listing metadata
//! let params = PaginationParams::default();
//! let meta = PaginationMeta::new(&params, 42);
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod serde;

// Re-export commonly used types at crate root
pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
pub use roles::UserRole;
