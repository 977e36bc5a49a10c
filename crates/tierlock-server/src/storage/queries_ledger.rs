//! View ledger queries.

use tierlock_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::{SubjectKind, ViewOutcome};

const fn increment_sql(subject: SubjectKind) -> &'static str {
    match subject {
        SubjectKind::Game => {
            "UPDATE games SET view_count = view_count + 1 WHERE id = ? RETURNING view_count"
        }
        SubjectKind::Link => {
            "UPDATE download_links SET view_count = view_count + 1 WHERE id = ? RETURNING view_count"
        }
    }
}

const fn count_sql(subject: SubjectKind) -> &'static str {
    match subject {
        SubjectKind::Game => "SELECT view_count FROM games WHERE id = ?",
        SubjectKind::Link => "SELECT view_count FROM download_links WHERE id = ?",
    }
}

impl Database {
    // =========================================================================
    // View ledger queries
    // =========================================================================

    /// Record a view of `subject_id` by `viewer_id`.
    ///
    /// The ledger insert and the counter increment share one transaction and
    /// the increment only runs when the insert added a row, so concurrent
    /// first views from the same viewer count once.
    pub async fn record_view(
        &self,
        subject: SubjectKind,
        subject_id: &str,
        viewer_id: &str,
    ) -> Result<ViewOutcome, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO view_records (subject_type, subject_id, viewer_id, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(subject_type, subject_id, viewer_id) DO NOTHING",
        )
        .bind(subject.as_str())
        .bind(subject_id)
        .bind(viewer_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let sql = if inserted {
            increment_sql(subject)
        } else {
            count_sql(subject)
        };
        let total: Option<i64> = sqlx::query_scalar(sql)
            .bind(subject_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(total_views) = total else {
            tx.rollback().await?;
            return Err(DatabaseError::NotFound(format!("{subject} {subject_id}")));
        };

        tx.commit().await?;

        Ok(ViewOutcome {
            is_new_view: inserted,
            total_views,
        })
    }

    /// Current counter value for a subject.
    pub async fn view_count(
        &self,
        subject: SubjectKind,
        subject_id: &str,
    ) -> Result<i64, DatabaseError> {
        sqlx::query_scalar(count_sql(subject))
            .bind(subject_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{subject} {subject_id}")))
    }

    /// Number of ledger rows for a subject. Always equals its counter.
    pub async fn count_view_records(
        &self,
        subject: SubjectKind,
        subject_id: &str,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM view_records WHERE subject_type = ? AND subject_id = ?",
        )
        .bind(subject.as_str())
        .bind(subject_id)
        .fetch_one(self.pool())
        .await?;

        Ok(row.0)
    }
}
