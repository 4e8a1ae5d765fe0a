//! Authentication module: password hashing, token issuance/verification,
//! and per-request identity extraction.
//!
//! ## Security Model
//!
//! - Passwords are hashed with Argon2id; the salt is embedded in each hash
//!   and the plaintext never touches storage.
//! - Identity tokens are self-issued HS256 JWTs signed with the process-wide
//!   server secret. They are stateless: there is no revocation list.
//! - Identity is extracted once per request at the HTTP layer and bound to
//!   that request's extensions; nothing is shared across requests.
//! - Authentication failures are always a generic 401. Ownership failures
//!   (403) are a separate class raised only after authentication succeeds.

mod context;
mod extractor;
pub mod password;
pub mod token;

pub use context::AuthIdentity;
pub use extractor::require_auth;
pub use token::{TokenError, TokenService};
