//! # Scholaris CLI
//!
//! Administration and database seeding utilities for Scholaris.
//!
//! This library crate provides the seeding functionality used by the CLI binary.
//!
//! ## Usage
//!
//! ```ignore
//! use scholaris_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3); // 3 schools with defaults
//! seed_all(&pool, config).await?;
//! ```

pub mod seeder;
