//! Ownership enforcement for mutating resource operations.
//!
//! Applied by handlers after the target resource has been confirmed to
//! exist and after the caller's identity has been verified. A missing
//! resource is `NotFound`; an existing resource with a different owner is
//! `Forbidden`. Unauthenticated callers never reach this check.

use crate::error::ApiError;
use crate::types::IdentityId;

/// Allow the operation iff the verified caller is the resource's owner.
///
/// Exact string comparison; both ids are already normalized to the backend-
/// independent string form. No delegation, no admin override.
pub fn require_owner(
    caller: &IdentityId,
    owner: &IdentityId,
    denial: &str,
) -> Result<(), ApiError> {
    if caller == owner {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denial.to_string()))
    }
}
