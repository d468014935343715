//! Access token claims.

use classroom_core::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims embedded in every access token.
///
/// `role` decodes leniently: a token minted without a role, or with a role
/// name this server does not know, resolves to [`Role::Guest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Expiration, Unix timestamp
    pub exp: usize,
    /// Issued at, Unix timestamp
    pub iat: usize,
}
