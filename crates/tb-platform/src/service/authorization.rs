//! Authorization Policy
//!
//! A pure decision over the caller's role, composed in front of each
//! role-gated operation.

use crate::error::{PlatformError, Result};
use crate::service::auth::AccessTokenClaims;

pub const ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

/// Allow when `subject_role` is one of `required_roles`.
/// An empty requirement allows any authenticated subject.
pub fn authorize(subject_role: &str, required_roles: &[&str]) -> AccessDecision {
    if required_roles.is_empty() || required_roles.contains(&subject_role) {
        AccessDecision::Allow
    } else {
        AccessDecision::Deny
    }
}

/// Identity of an authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub username: String,
    pub role: String,
}

impl From<AccessTokenClaims> for AuthContext {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Guard helpers used by handlers
pub mod checks {
    use super::*;

    pub fn require_roles(ctx: &AuthContext, roles: &[&str]) -> Result<()> {
        match authorize(&ctx.role, roles) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny => {
                tracing::debug!(username = %ctx.username, role = %ctx.role, "Access denied");
                Err(PlatformError::forbidden("insufficient permissions!"))
            }
        }
    }

    pub fn require_admin(ctx: &AuthContext) -> Result<()> {
        require_roles(ctx, &[ADMIN_ROLE])
    }
}
