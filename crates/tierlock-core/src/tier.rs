//! Role and access tier vocabulary.
//!
//! Non-staff roles are totally ordered (`ultra > plus > member`) and share a
//! rank space with the gated tiers (`free = 0, plus = 1, ultra = 2`). Staff
//! roles never enter the rank space; callers check [`Role::is_staff`] first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscription or staff level of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Plus,
    Ultra,
    Support,
    Moderator,
    Admin,
}

impl Role {
    /// Staff bypass every tier check.
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Support | Self::Moderator | Self::Admin)
    }

    /// Position in the non-staff hierarchy. `None` for staff.
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::Member => Some(0),
            Self::Plus => Some(1),
            Self::Ultra => Some(2),
            Self::Support | Self::Moderator | Self::Admin => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Plus => "plus",
            Self::Ultra => "ultra",
            Self::Support => "support",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

/// A gated tier: the only tiers the policy engine evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Plus,
    Ultra,
}

impl Tier {
    pub const fn rank(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Plus => 1,
            Self::Ultra => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Plus => "plus",
            Self::Ultra => "ultra",
        }
    }
}

/// Access tier attached to a resource.
///
/// `Differentiated` is not part of the hierarchy: the resource carries one
/// target per non-staff rank and is resolved by the link resolver instead of
/// the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Free,
    Plus,
    Ultra,
    Differentiated,
}

impl AccessTier {
    /// The gated tier, or `None` for `Differentiated`.
    pub const fn gate(self) -> Option<Tier> {
        match self {
            Self::Free => Some(Tier::Free),
            Self::Plus => Some(Tier::Plus),
            Self::Ultra => Some(Tier::Ultra),
            Self::Differentiated => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Plus => "plus",
            Self::Ultra => "ultra",
            Self::Differentiated => "differentiated",
        }
    }
}

impl From<Tier> for AccessTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self::Free,
            Tier::Plus => Self::Plus,
            Tier::Ultra => Self::Ultra,
        }
    }
}

/// Error returned when parsing an unknown role or tier name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "plus" => Ok(Self::Plus),
            "ultra" => Ok(Self::Ultra),
            "support" => Ok(Self::Support),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(ParseError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for Tier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "plus" => Ok(Self::Plus),
            "ultra" => Ok(Self::Ultra),
            other => Err(ParseError {
                kind: "tier",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for AccessTier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "differentiated" => Ok(Self::Differentiated),
            other => other.parse::<Tier>().map(Self::from).map_err(|_| ParseError {
                kind: "access tier",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
