//! # Classroom Core
//!
//! Core types, errors, and utilities for the classroom API.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: Page-based pagination parameters and metadata
//! - [`password`]: bcrypt password hashing and verification
//! - [`roles`]: The caller [`Role`] enum shared by auth and admission
//!
//! # Example
//!
//! ```ignore
//! use classroom_core::{AppError, Role, hash_password};
//!
//! let err = AppError::not_found(anyhow::anyhow!("Subject not found"));
//! let role: Role = "teacher".parse()?;
//! let hash = hash_password("secure_password")?;
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod roles;

pub use errors::AppError;
pub use pagination::{PageMeta, PageParams};
pub use password::{hash_password, verify_password};
pub use roles::Role;
