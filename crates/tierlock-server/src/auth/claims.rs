//! JWT claims structure for Tierlock auth.

use serde::{Deserialize, Serialize};

use tierlock_core::{Principal, Role};

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (user ID).
    pub sub: String,
    /// Subscription or staff role at issue time.
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal::new(self.sub.clone(), self.role)
    }
}
