//! # Classroom Auth
//!
//! Access token claims and HS256 JWT helpers.
//!
//! ```ignore
//! use classroom_auth::{create_access_token, verify_token};
//!
//! let issued = create_access_token(user_id, "t@school.io", Role::Teacher, &jwt_config)?;
//! let claims = verify_token(&issued.token, &jwt_config)?;
//! ```

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{IssuedToken, create_access_token, verify_token};
