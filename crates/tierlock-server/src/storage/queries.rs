//! Resource queries for the Tierlock server.
//!
//! Games and download links are authored by the content-management flows;
//! this core only reads them, apart from the writers below used by those
//! flows and by tests.

use tierlock_core::db::unix_timestamp;
use tierlock_core::{AccessTier, Tier};

use super::db::{Database, DatabaseError};
use super::models::{GameRow, LinkRow};

/// Parameters for creating a game.
pub struct GameParams<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub access_tier: Tier,
}

/// Parameters for creating a download link.
pub struct LinkParams<'a> {
    pub id: &'a str,
    pub game_id: &'a str,
    pub position: i64,
    pub label: &'a str,
    pub access_tier: Option<AccessTier>,
    pub legacy_vip: bool,
    pub target_url: Option<&'a str>,
    pub member_url: Option<&'a str>,
    pub plus_url: Option<&'a str>,
    pub ultra_url: Option<&'a str>,
}

impl Database {
    // =========================================================================
    // Game queries
    // =========================================================================

    /// Create a game.
    pub async fn create_game(&self, params: &GameParams<'_>) -> Result<GameRow, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query("INSERT INTO games (id, title, access_tier, created_at) VALUES (?, ?, ?, ?)")
            .bind(params.id)
            .bind(params.title)
            .bind(params.access_tier.as_str())
            .bind(now)
            .execute(self.pool())
            .await?;

        self.get_game(params.id).await
    }

    /// Get a game by ID.
    pub async fn get_game(&self, id: &str) -> Result<GameRow, DatabaseError> {
        sqlx::query_as::<_, GameRow>("SELECT * FROM games WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Game {id}")))
    }

    // =========================================================================
    // Download link queries
    // =========================================================================

    /// Create a download link.
    pub async fn create_link(&self, params: &LinkParams<'_>) -> Result<LinkRow, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO download_links (id, game_id, position, label, access_tier, legacy_vip, target_url, member_url, plus_url, ultra_url, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.game_id)
        .bind(params.position)
        .bind(params.label)
        .bind(params.access_tier.map(AccessTier::as_str))
        .bind(i64::from(params.legacy_vip))
        .bind(params.target_url)
        .bind(params.member_url)
        .bind(params.plus_url)
        .bind(params.ultra_url)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_link(params.id).await
    }

    /// Get a download link by ID.
    pub async fn get_link(&self, id: &str) -> Result<LinkRow, DatabaseError> {
        sqlx::query_as::<_, LinkRow>("SELECT * FROM download_links WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Link {id}")))
    }

    /// List a game's links in position order.
    pub async fn list_links(&self, game_id: &str) -> Result<Vec<LinkRow>, DatabaseError> {
        let links = sqlx::query_as::<_, LinkRow>(
            "SELECT * FROM download_links WHERE game_id = ? ORDER BY position ASC, id ASC",
        )
        .bind(game_id)
        .fetch_all(self.pool())
        .await?;

        Ok(links)
    }
}
