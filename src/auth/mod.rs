//! Token permission checks.

pub mod registry;
pub mod verifier;

pub use registry::{Accessor, Permission, PermissionRegistry};
pub use verifier::TokenVerifier;
