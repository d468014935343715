//! Request middleware and extractors.
//!
//! - [`admission`]: the pre-auth and post-auth admission gates
//! - [`auth`]: bearer identity resolution and role extractors
//!
//! # Ordering
//!
//! A request meets them in this order:
//!
//! 1. `resolve_identity` verifies a bearer token, storing an [`auth::AuthUser`]
//!    or marking the request with [`auth::RejectedCredential`]
//! 2. `pre_auth_admission` screens every request without an `AuthUser` with
//!    the guest policy
//! 3. `reject_invalid_credential` answers marked requests with 401
//! 4. `post_auth_admission` screens identified callers with their role policy
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::{AuthUser, RequireAdmin};
//!
//! async fn get_session(auth_user: AuthUser) -> impl IntoResponse { /* ... */ }
//!
//! async fn delete_subject(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
//!     // only admins reach this point
//! }
//! ```

pub mod admission;
pub mod auth;
