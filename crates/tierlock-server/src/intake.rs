//! Moderation intake.
//!
//! One-per-principal-per-subject queues for dead-link reports and update
//! requests. Submission is gated on authentication only, never on
//! entitlement to the subject.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use tierlock_core::AccessTier;
use tierlock_core::db::{DatabaseError, with_timeout};

use crate::storage::{Database, IntakeKind, Submission, SubmissionParams};

/// Subject state captured when the submission is filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub title: String,
    pub access_tier: AccessTier,
}

/// Accepts submissions and feeds the review queue.
#[derive(Clone)]
pub struct ModerationIntake {
    db: Database,
    timeout: Duration,
}

impl ModerationIntake {
    pub const fn new(db: Database, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// File a submission. Returns `false` when this principal already filed
    /// one for the subject; that is an expected outcome, not an error.
    #[instrument(skip(self, snapshot), fields(op = "Submit"))]
    pub async fn submit(
        &self,
        kind: IntakeKind,
        principal_id: &str,
        subject_id: &str,
        snapshot: &Snapshot,
    ) -> Result<bool, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();
        let params = SubmissionParams {
            id: &id,
            subject_id,
            principal_id,
            title: &snapshot.title,
            access_tier: snapshot.access_tier.as_str(),
        };

        let accepted = with_timeout(self.timeout, self.db.insert_submission(kind, &params))
            .await
            .inspect_err(|e| {
                warn!(%kind, subject_id, principal_id, error = %e, "Intake write failed");
            })?;

        if accepted {
            info!(
                %kind,
                submission_id = %id,
                subject_id,
                principal_id,
                title = %snapshot.title,
                tier = %snapshot.access_tier,
                "Submission queued for review"
            );
        } else {
            debug!(%kind, subject_id, principal_id, "Duplicate submission ignored");
        }
        Ok(accepted)
    }

    /// Accepted submissions, newest first.
    pub async fn review_queue(
        &self,
        kind: IntakeKind,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Submission>, DatabaseError> {
        with_timeout(self.timeout, self.db.list_submissions(kind, limit, offset)).await
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn snapshot() -> Snapshot {
        Snapshot {
            title: "Ultra mirror".into(),
            access_tier: AccessTier::Ultra,
        }
    }

    async fn intake() -> ModerationIntake {
        let db = Database::open_in_memory().await.unwrap();
        ModerationIntake::new(db, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn resubmission_is_not_accepted() {
        let intake = intake().await;

        assert!(
            intake
                .submit(IntakeKind::DeadLink, "u1", "l1", &snapshot())
                .await
                .unwrap()
        );
        assert!(
            !intake
                .submit(IntakeKind::DeadLink, "u1", "l1", &snapshot())
                .await
                .unwrap()
        );

        let queue = intake
            .review_queue(IntakeKind::DeadLink, 100, 0)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].title, "Ultra mirror");
        assert_eq!(queue[0].access_tier, "ultra");
    }

    #[tokio::test]
    async fn snapshot_is_frozen_at_submission() {
        let intake = intake().await;
        intake
            .submit(IntakeKind::UpdateRequest, "u1", "g1", &snapshot())
            .await
            .unwrap();

        let renamed = Snapshot {
            title: "Renamed".into(),
            access_tier: AccessTier::Free,
        };
        intake
            .submit(IntakeKind::UpdateRequest, "u1", "g1", &renamed)
            .await
            .unwrap();

        let queue = intake
            .review_queue(IntakeKind::UpdateRequest, 100, 0)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].title, "Ultra mirror");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_accept_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("intake.db")).await.unwrap();
        let intake = Arc::new(ModerationIntake::new(db, Duration::from_secs(5)));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let intake = Arc::clone(&intake);
            handles.push(tokio::spawn(async move {
                intake
                    .submit(IntakeKind::DeadLink, "u1", "l1", &snapshot())
                    .await
                    .unwrap()
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }
}
