//! HTTP binding of the entitlement and engagement operations.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use tierlock_core::db::DatabaseError;
use tierlock_core::{
    AccessTier, Denial, Principal, ResolveError, Tier, check_access, resolve,
};

use crate::auth::{AuthError, JwtManager, bearer_principal};
use crate::intake::{ModerationIntake, Snapshot};
use crate::ledger::{EngagementLedger, LedgerError};
use crate::storage::{Database, IntakeKind, SubjectKind, Submission, ViewOutcome};

/// Header carrying the session id substituted for anonymous viewers.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub ledger: EngagementLedger,
    pub intake: ModerationIntake,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/games/{id}/access", get(game_access))
        .route("/games/{id}/views", post(game_view))
        .route("/games/{id}/links", get(game_links))
        .route("/games/{id}/update-requests", post(request_update))
        .route("/links/{id}/resolve", post(resolve_link))
        .route("/links/{id}/reports", post(report_link))
        .route("/review/dead-links", get(review_dead_links))
        .route("/review/update-requests", get(review_update_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =========================================================================
// Errors
// =========================================================================

/// Every failure a handler can return, classified for the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Denied(Denial),

    #[error("staff only")]
    StaffOnly,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("link {link_id} is unavailable")]
    Misconfigured { link_id: String },

    #[error(transparent)]
    Storage(DatabaseError),
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        Self::Denied(denial)
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Denied(denial) => Self::Denied(denial),
            ResolveError::Misconfigured { link_id } => Self::Misconfigured { link_id },
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AnonymousRejected => Self::Denied(Denial::NotAuthenticated),
            LedgerError::MissingSession => {
                Self::BadRequest(format!("anonymous views require the {SESSION_HEADER} header"))
            }
            LedgerError::Storage(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            Self::Auth(_) | Self::Denied(Denial::NotAuthenticated) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "not_authenticated", "message": message })),
            )
                .into_response(),
            Self::Denied(denial @ Denial::UpgradeRequired(tier)) => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": denial.code(), "message": message, "min_tier": tier })),
            )
                .into_response(),
            Self::StaffOnly => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "staff_only", "message": message })),
            )
                .into_response(),
            Self::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "bad_request", "message": message })),
            )
                .into_response(),
            Self::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not_found", "message": message })),
            )
                .into_response(),
            Self::Misconfigured { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "unavailable", "message": message })),
            )
                .into_response(),
            Self::Storage(e) if e.is_retryable() => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, HeaderValue::from_static("1"))],
                Json(json!({ "error": "try_again", "message": "storage temporarily unavailable" })),
            )
                .into_response(),
            Self::Storage(e) => {
                warn!(error = %e, "Non-retryable storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal", "message": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn principal(state: &AppState, headers: &HeaderMap) -> Result<Option<Principal>, ApiError> {
    Ok(bearer_principal(&state.jwt, headers)?)
}

fn require_principal(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    principal(state, headers)?.ok_or(ApiError::Denied(Denial::NotAuthenticated))
}

fn require_staff(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let principal = require_principal(state, headers)?;
    if !principal.role.is_staff() {
        return Err(ApiError::StaffOnly);
    }
    Ok(principal)
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

// =========================================================================
// Handlers
// =========================================================================

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessResponse {
    pub allowed: bool,
    pub reason: Option<String>,
    pub min_tier: Option<Tier>,
}

/// `GET /games/{id}/access` — page-level gate. The decision is data, so a
/// denial is still a 200.
pub async fn game_access(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<AccessResponse>, ApiError> {
    let principal = principal(&state, &headers)?;
    let game = state.db.get_game(&id).await?.to_game()?;

    let decision = check_access(principal.as_ref(), game.access_tier);
    let denial = decision.denial();
    if let Some(denial) = denial {
        debug!(game_id = %id, reason = denial.code(), "Game access denied");
    }

    Ok(Json(AccessResponse {
        allowed: decision.is_allowed(),
        reason: denial.map(|d| d.code().to_string()),
        min_tier: denial.and_then(Denial::min_tier),
    }))
}

/// `POST /games/{id}/views`
pub async fn game_view(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<ViewOutcome>, ApiError> {
    let principal = principal(&state, &headers)?;
    let viewer = state
        .ledger
        .viewer_id(principal.as_ref(), session_id(&headers))?;
    let outcome = state
        .ledger
        .record_view(SubjectKind::Game, &id, &viewer)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkSummary {
    pub id: String,
    pub position: i64,
    pub label: String,
    pub access_tier: AccessTier,
    pub total_views: i64,
}

/// `GET /games/{id}/links` — links in position order, without targets.
/// Browsing is gated on the game's tier.
pub async fn game_links(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<LinkSummary>>, ApiError> {
    let principal = principal(&state, &headers)?;
    let game = state.db.get_game(&id).await?.to_game()?;
    if let Some(denial) = check_access(principal.as_ref(), game.access_tier).denial() {
        debug!(game_id = %id, reason = denial.code(), "Link listing denied");
        return Err(denial.into());
    }

    let rows = state.db.list_links(&id).await?;

    let mut links = Vec::with_capacity(rows.len());
    for row in rows {
        let link = row.to_link()?;
        links.push(LinkSummary {
            access_tier: link.effective_tier(),
            id: link.id,
            position: link.position,
            label: link.label,
            total_views: row.view_count,
        });
    }
    Ok(Json(links))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub url: String,
    pub is_new_view: bool,
    pub total_views: i64,
}

/// `POST /links/{id}/resolve` — check, resolve, count, then hand out the URL.
pub async fn resolve_link(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let principal = principal(&state, &headers)?;
    let link = state.db.get_link(&id).await?.to_link()?;

    let url = match resolve(principal.as_ref(), &link) {
        Ok(url) => url.to_string(),
        Err(ResolveError::Denied(denial)) => {
            debug!(link_id = %id, reason = denial.code(), "Link access denied");
            return Err(denial.into());
        }
        Err(e) => return Err(e.into()),
    };

    // resolve() refuses anonymous callers
    let viewer = principal.map(|p| p.id).unwrap_or_default();
    let outcome = state
        .ledger
        .record_view(SubjectKind::Link, &id, &viewer)
        .await?;

    Ok(Json(ResolveResponse {
        url,
        is_new_view: outcome.is_new_view,
        total_views: outcome.total_views,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub accepted: bool,
}

fn submit_response(accepted: bool) -> (StatusCode, Json<SubmitResponse>) {
    let status = if accepted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(SubmitResponse { accepted }))
}

/// `POST /links/{id}/reports` — dead-link report. Not gated on access to the
/// link itself.
pub async fn report_link(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let principal = require_principal(&state, &headers)?;
    let link = state.db.get_link(&id).await?.to_link()?;

    let snapshot = Snapshot {
        access_tier: link.effective_tier(),
        title: link.label,
    };
    let accepted = state
        .intake
        .submit(IntakeKind::DeadLink, &principal.id, &id, &snapshot)
        .await?;
    Ok(submit_response(accepted))
}

/// `POST /games/{id}/update-requests`
pub async fn request_update(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let principal = require_principal(&state, &headers)?;
    let game = state.db.get_game(&id).await?.to_game()?;

    let snapshot = Snapshot {
        title: game.title,
        access_tier: game.access_tier.into(),
    };
    let accepted = state
        .intake
        .submit(IntakeKind::UpdateRequest, &principal.id, &id, &snapshot)
        .await?;
    Ok(submit_response(accepted))
}

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

const fn default_limit() -> u32 {
    50
}

/// `GET /review/dead-links`
pub async fn review_dead_links(
    Query(page): Query<Page>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Submission>>, ApiError> {
    review(&state, &headers, IntakeKind::DeadLink, &page).await
}

/// `GET /review/update-requests`
pub async fn review_update_requests(
    Query(page): Query<Page>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Submission>>, ApiError> {
    review(&state, &headers, IntakeKind::UpdateRequest, &page).await
}

async fn review(
    state: &AppState,
    headers: &HeaderMap,
    kind: IntakeKind,
    page: &Page,
) -> Result<Json<Vec<Submission>>, ApiError> {
    require_staff(state, headers)?;
    let limit = page.limit.min(500);
    let queue = state.intake.review_queue(kind, limit, page.offset).await?;
    Ok(Json(queue))
}
