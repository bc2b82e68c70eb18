//! Authorization checks
//!
//! Checks run in a fixed order: identity gate, then role (when the route
//! needs one), then ownership (when the action targets a resource). The
//! first failing check decides the response.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use quill_db::UserRole;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AuthError, ForbiddenReason};
use crate::middleware::{IdentityGate, VerifiedIdentity};
use crate::store::ResourceStore;

/// Require the caller to hold exactly `required` role
///
/// Roles are flat: holding `admin` does not satisfy a `user` requirement.
pub fn require_role(identity: &VerifiedIdentity, required: UserRole) -> Result<(), AuthError> {
    if identity.role != required {
        debug!(
            "Subject {} has role {}, {} required",
            identity.subject_id, identity.role, required
        );
        return Err(AuthError::Forbidden(ForbiddenReason::RoleRequired(required)));
    }
    Ok(())
}

/// Require the caller to be the owner of a resource
pub fn require_ownership(identity: &VerifiedIdentity, owner_id: i64) -> Result<(), AuthError> {
    if identity.subject_id != owner_id {
        debug!(
            "Subject {} is not the owner ({}) of the target resource",
            identity.subject_id, owner_id
        );
        return Err(AuthError::Forbidden(ForbiddenReason::NotOwner));
    }
    Ok(())
}

/// Authorize a mutation of `resource_id` by the caller
///
/// The owner is read from the store at call time, right before the check.
pub async fn authorize_mutation<R>(
    identity: &VerifiedIdentity,
    resources: &R,
    resource_id: i64,
) -> Result<(), AuthError>
where
    R: ResourceStore + ?Sized,
{
    let owner_id = resources
        .owner_of(resource_id)
        .await?
        .ok_or(AuthError::ResourceNotFound(resource_id))?;

    require_ownership(identity, owner_id)
}

/// Extractor for an authenticated admin caller
pub struct RequireAdmin(pub VerifiedIdentity);

impl<S> FromRequestParts<S> for RequireAdmin
where
    Arc<IdentityGate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = VerifiedIdentity::from_request_parts(parts, state).await?;
        require_role(&identity, UserRole::Admin)?;

        Ok(RequireAdmin(identity))
    }
}
