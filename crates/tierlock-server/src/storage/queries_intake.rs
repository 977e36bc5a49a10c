//! Moderation intake queries.
//!
//! Dead-link reports and update requests share one shape and differ only in
//! table and key columns.

use tierlock_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::{IntakeKind, Submission};

/// Parameters for filing a submission.
pub struct SubmissionParams<'a> {
    pub id: &'a str,
    pub subject_id: &'a str,
    pub principal_id: &'a str,
    pub title: &'a str,
    pub access_tier: &'a str,
}

const fn insert_sql(kind: IntakeKind) -> &'static str {
    match kind {
        IntakeKind::DeadLink => {
            "INSERT INTO dead_link_reports (id, link_id, reporter_id, title, access_tier, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(link_id, reporter_id) DO NOTHING"
        }
        IntakeKind::UpdateRequest => {
            "INSERT INTO update_requests (id, game_id, requester_id, title, access_tier, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(game_id, requester_id) DO NOTHING"
        }
    }
}

const fn select_columns(kind: IntakeKind) -> &'static str {
    match kind {
        IntakeKind::DeadLink => {
            "SELECT id, link_id AS subject_id, reporter_id AS principal_id, title, access_tier, created_at \
             FROM dead_link_reports"
        }
        IntakeKind::UpdateRequest => {
            "SELECT id, game_id AS subject_id, requester_id AS principal_id, title, access_tier, created_at \
             FROM update_requests"
        }
    }
}

const fn key_filter(kind: IntakeKind) -> &'static str {
    match kind {
        IntakeKind::DeadLink => "WHERE link_id = ? AND reporter_id = ?",
        IntakeKind::UpdateRequest => "WHERE game_id = ? AND requester_id = ?",
    }
}

const fn subject_filter(kind: IntakeKind) -> &'static str {
    match kind {
        IntakeKind::DeadLink => "WHERE link_id = ?",
        IntakeKind::UpdateRequest => "WHERE game_id = ?",
    }
}

impl Database {
    // =========================================================================
    // Intake queries
    // =========================================================================

    /// Insert a submission unless the principal already filed one for the
    /// subject. Returns `true` when this call stored the row.
    pub async fn insert_submission(
        &self,
        kind: IntakeKind,
        params: &SubmissionParams<'_>,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(insert_sql(kind))
            .bind(params.id)
            .bind(params.subject_id)
            .bind(params.principal_id)
            .bind(params.title)
            .bind(params.access_tier)
            .bind(now)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get the submission a principal filed for a subject, if any.
    pub async fn get_submission(
        &self,
        kind: IntakeKind,
        subject_id: &str,
        principal_id: &str,
    ) -> Result<Option<Submission>, DatabaseError> {
        let sql = format!("{} {}", select_columns(kind), key_filter(kind));
        let submission = sqlx::query_as::<_, Submission>(&sql)
            .bind(subject_id)
            .bind(principal_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(submission)
    }

    /// List submissions newest first.
    pub async fn list_submissions(
        &self,
        kind: IntakeKind,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Submission>, DatabaseError> {
        let sql = format!(
            "{} ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
            select_columns(kind)
        );
        let submissions = sqlx::query_as::<_, Submission>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;

        Ok(submissions)
    }

    /// Count submissions filed against one subject.
    pub async fn count_submissions(
        &self,
        kind: IntakeKind,
        subject_id: &str,
    ) -> Result<i64, DatabaseError> {
        let table = match kind {
            IntakeKind::DeadLink => "dead_link_reports",
            IntakeKind::UpdateRequest => "update_requests",
        };
        let sql = format!("SELECT COUNT(*) FROM {table} {}", subject_filter(kind));
        let row: (i64,) = sqlx::query_as(&sql)
            .bind(subject_id)
            .fetch_one(self.pool())
            .await?;

        Ok(row.0)
    }
}
