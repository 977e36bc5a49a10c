//! Engagement ledger.
//!
//! At-most-once-per-viewer view counting for games and download links.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use tierlock_core::Principal;
use tierlock_core::config::AnonymousViewPolicy;
use tierlock_core::db::{DatabaseError, with_timeout};

use crate::storage::{Database, SubjectKind, ViewOutcome};

/// Prefix for viewer ids substituted from a session.
const SESSION_PREFIX: &str = "session:";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Anonymous views are not counted")]
    AnonymousRejected,

    #[error("Anonymous viewer has no session id")]
    MissingSession,

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// Records views against the storage ledger.
#[derive(Clone)]
pub struct EngagementLedger {
    db: Database,
    timeout: Duration,
    anonymous: AnonymousViewPolicy,
}

impl EngagementLedger {
    pub const fn new(db: Database, timeout: Duration, anonymous: AnonymousViewPolicy) -> Self {
        Self {
            db,
            timeout,
            anonymous,
        }
    }

    /// The id a view is deduplicated under.
    ///
    /// Accounts use their principal id. Anonymous callers are substituted by
    /// session only under [`AnonymousViewPolicy::PerSession`].
    pub fn viewer_id(
        &self,
        principal: Option<&Principal>,
        session_id: Option<&str>,
    ) -> Result<String, LedgerError> {
        if let Some(principal) = principal {
            return Ok(principal.id.clone());
        }
        match self.anonymous {
            AnonymousViewPolicy::Reject => Err(LedgerError::AnonymousRejected),
            AnonymousViewPolicy::PerSession => session_id
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("{SESSION_PREFIX}{s}"))
                .ok_or(LedgerError::MissingSession),
        }
    }

    /// Count a view of `subject_id` by `viewer_id` unless it was already
    /// counted. Storage failures never report a new view.
    #[instrument(skip(self), fields(op = "RecordView"))]
    pub async fn record_view(
        &self,
        subject: SubjectKind,
        subject_id: &str,
        viewer_id: &str,
    ) -> Result<ViewOutcome, LedgerError> {
        if viewer_id.is_empty() {
            return Err(LedgerError::MissingSession);
        }

        let outcome = with_timeout(
            self.timeout,
            self.db.record_view(subject, subject_id, viewer_id),
        )
        .await
        .inspect_err(|e| {
            if !matches!(e, DatabaseError::NotFound(_)) {
                warn!(%subject, subject_id, viewer_id, error = %e, "View ledger write failed");
            }
        })?;

        debug!(
            %subject,
            subject_id,
            is_new_view = outcome.is_new_view,
            total_views = outcome.total_views,
            "View recorded"
        );
        Ok(outcome)
    }
}
