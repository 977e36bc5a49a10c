//! Authentication module for the Tierlock server.
//!
//! Resolves the calling principal from a bearer JWT.

pub mod claims;
pub mod jwt;
pub mod principal;

pub use claims::Claims;
pub use jwt::JwtManager;
pub use principal::{AuthError, bearer_principal};
