//! Verified identity bound to a single request.

use serde::{Deserialize, Serialize};

use crate::types::IdentityId;

/// Identity extracted from a verified bearer token.
///
/// Inserted into the request's extensions by the auth middleware and cloned
/// out by handlers. The binding is request-scoped: it lives and dies with
/// the one request it was extracted for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthIdentity {
    identity_id: IdentityId,
}

impl AuthIdentity {
    /// Create a context for a verified identity.
    pub fn new(identity_id: IdentityId) -> Self {
        Self { identity_id }
    }

    /// The verified identity id (the token's subject).
    pub fn identity_id(&self) -> &IdentityId {
        &self.identity_id
    }
}
