//! Entitlement policy engine.
//!
//! The single place where the role/tier hierarchy is evaluated. Everything
//! that gates on tier (game pages, link resolution) goes through
//! [`check_access`].

use serde::{Deserialize, Serialize};

use crate::tier::{Role, Tier};

/// An authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", content = "min_tier", rename_all = "snake_case")]
pub enum Denial {
    #[error("authentication required")]
    NotAuthenticated,

    /// Carries the minimum tier that would have been granted.
    #[error("{0} tier required")]
    UpgradeRequired(Tier),
}

impl Denial {
    /// Stable machine-readable code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::UpgradeRequired(_) => "upgrade_required",
        }
    }

    pub const fn min_tier(self) -> Option<Tier> {
        match self {
            Self::NotAuthenticated => None,
            Self::UpgradeRequired(tier) => Some(tier),
        }
    }
}

/// Outcome of [`check_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(Denial),
}

impl AccessDecision {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub const fn denial(self) -> Option<Denial> {
        match self {
            Self::Allowed => None,
            Self::Denied(d) => Some(d),
        }
    }

    /// Convert into a `Result` so callers can use `?`.
    pub const fn into_result(self) -> Result<(), Denial> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(d) => Err(d),
        }
    }
}

/// Decide whether `principal` may reach a resource gated at `required`.
///
/// Anonymous callers are always denied. Staff are always allowed. Everyone
/// else is allowed iff their rank is at least the tier's rank.
pub fn check_access(principal: Option<&Principal>, required: Tier) -> AccessDecision {
    let Some(principal) = principal else {
        return AccessDecision::Denied(Denial::NotAuthenticated);
    };

    match principal.role.rank() {
        None => AccessDecision::Allowed,
        Some(rank) if rank >= required.rank() => AccessDecision::Allowed,
        Some(_) => AccessDecision::Denied(Denial::UpgradeRequired(required)),
    }
}
