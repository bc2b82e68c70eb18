//! Quill Authentication and Authorization
//!
//! This crate provides password hashing, signed identity tokens, the
//! identity gate that authenticates every request, and the role and
//! ownership checks applied before a mutation.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod store;

pub use error::{AuthError, ForbiddenReason, UnauthenticatedReason, ValidationError, ValidationErrorKind};
pub use jwt::{Claims, TOKEN_ALGORITHM, TokenCodec, TokenIdentity};
pub use middleware::{IdentityGate, VerifiedIdentity, extract_bearer_token, identity_layer};
pub use password::{hash_password, verify_password};
pub use policy::{RequireAdmin, authorize_mutation, require_ownership, require_role};
pub use store::{Credential, CredentialStore, ResourceStore, StoreError};
