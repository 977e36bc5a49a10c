//! Protected resource descriptors.

use serde::{Deserialize, Serialize};

use crate::tier::{AccessTier, Role, Tier};

/// A game page. Its tier gates browsing, not individual downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub title: String,
    pub access_tier: Tier,
}

/// Per-rank targets of a differentiated link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedUrls {
    pub member: Option<String>,
    pub plus: Option<String>,
    pub ultra: Option<String>,
}

impl RankedUrls {
    /// URL configured for the given non-staff rank, if any.
    pub fn for_rank(&self, rank: u8) -> Option<&str> {
        match rank {
            0 => self.member.as_deref(),
            1 => self.plus.as_deref(),
            _ => self.ultra.as_deref(),
        }
    }

    pub fn for_role(&self, role: Role) -> Option<&str> {
        role.rank().and_then(|rank| self.for_rank(rank))
    }

    pub const fn is_empty(&self) -> bool {
        self.member.is_none() && self.plus.is_none() && self.ultra.is_none()
    }
}

/// A download attached to exactly one game.
///
/// `access_tier` may be absent on rows written before tiers existed; those
/// rows fall back to `legacy_vip_flag` (see [`DownloadLink::effective_tier`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub id: String,
    pub game_id: String,
    pub position: i64,
    pub label: String,
    pub access_tier: Option<AccessTier>,
    pub legacy_vip_flag: bool,
    /// Single target for `free`, `plus` and `ultra` links.
    pub target_url: Option<String>,
    /// Rank-keyed targets for `differentiated` links.
    pub ranked_urls: RankedUrls,
}

impl DownloadLink {
    /// The tier this link is gated at.
    ///
    /// An explicit tier always wins. Without one, the legacy VIP flag means
    /// `ultra` and its absence means `free`.
    pub const fn effective_tier(&self) -> AccessTier {
        match self.access_tier {
            Some(tier) => tier,
            None if self.legacy_vip_flag => AccessTier::Ultra,
            None => AccessTier::Free,
        }
    }

    /// Whether the stored targets match the link's shape.
    pub const fn is_well_formed(&self) -> bool {
        match self.effective_tier() {
            AccessTier::Differentiated => !self.ranked_urls.is_empty(),
            _ => self.target_url.is_some(),
        }
    }
}
