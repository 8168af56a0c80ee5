//! Shared helpers for the feature modules.
//!
//! - [`auth_helpers`]: Tenant scoping and the student visibility scope
//! - [`db`]: Mapping of Postgres constraint errors to API errors

pub mod auth_helpers;
pub mod db;
