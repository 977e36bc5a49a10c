//! Data models for Tierlock storage.

use serde::{Deserialize, Serialize};

use tierlock_core::{AccessTier, DownloadLink, Game, RankedUrls, Tier};

use super::db::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GameRow {
    pub id: String,
    pub title: String,
    pub access_tier: String,
    pub view_count: i64,
    pub created_at: i64,
}

impl GameRow {
    pub fn to_game(&self) -> Result<Game, DatabaseError> {
        let access_tier = self
            .access_tier
            .parse::<Tier>()
            .map_err(|e| DatabaseError::Decode(format!("game {}: {e}", self.id)))?;
        Ok(Game {
            id: self.id.clone(),
            title: self.title.clone(),
            access_tier,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LinkRow {
    pub id: String,
    pub game_id: String,
    pub position: i64,
    pub label: String,
    pub access_tier: Option<String>,
    pub legacy_vip: i64,
    pub target_url: Option<String>,
    pub member_url: Option<String>,
    pub plus_url: Option<String>,
    pub ultra_url: Option<String>,
    pub view_count: i64,
    pub created_at: i64,
}

impl LinkRow {
    pub fn to_link(&self) -> Result<DownloadLink, DatabaseError> {
        let access_tier = self
            .access_tier
            .as_deref()
            .map(str::parse::<AccessTier>)
            .transpose()
            .map_err(|e| DatabaseError::Decode(format!("link {}: {e}", self.id)))?;
        Ok(DownloadLink {
            id: self.id.clone(),
            game_id: self.game_id.clone(),
            position: self.position,
            label: self.label.clone(),
            access_tier,
            legacy_vip_flag: self.legacy_vip != 0,
            target_url: self.target_url.clone(),
            ranked_urls: RankedUrls {
                member: self.member_url.clone(),
                plus: self.plus_url.clone(),
                ultra: self.ultra_url.clone(),
            },
        })
    }
}

/// An accepted dead-link report or update request.
///
/// `title` and `access_tier` are the subject's state when it was filed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Submission {
    pub id: String,
    pub subject_id: String,
    pub principal_id: String,
    pub title: String,
    pub access_tier: String,
    pub created_at: i64,
}

/// What a view is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Game,
    Link,
}

impl SubjectKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Link => "link",
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOutcome {
    /// True only for the call that inserted the ledger row.
    pub is_new_view: bool,
    pub total_views: i64,
}

/// Which moderation queue a submission goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeKind {
    /// Keyed by link.
    DeadLink,
    /// Keyed by game.
    UpdateRequest,
}

impl IntakeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeadLink => "dead_link",
            Self::UpdateRequest => "update_request",
        }
    }

    pub const fn subject(self) -> SubjectKind {
        match self {
            Self::DeadLink => SubjectKind::Link,
            Self::UpdateRequest => SubjectKind::Game,
        }
    }
}

impl std::fmt::Display for IntakeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
