//! Shared types, errors, and configuration for Vaultline.
//!
//! This crate provides common types used across all other crates:
//! - Money and currency types with minor-unit precision
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - JWT verification for caller identity

pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, ErrorBody};
pub use jwt::{Claims, JwtError, JwtService};
