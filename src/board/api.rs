use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::errors::BoardError;

use super::db::BoardDb;
use super::keys::next_issue_key;
use super::models::{self, BoardKind, IssueDraft, IssueStatus, IssueType, Priority};
use super::ws::{WsMessage, broadcast_message};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: BoardDb,
    pub ws_tx: broadcast::Sender<String>,
    pub key_prefix: String,
    /// Coarse in-flight guard for creation: key derivation and the insert
    /// happen under this lock. Creation is the only guarded operation.
    create_gate: tokio::sync::Mutex<()>,
}

impl AppState {
    pub fn new(db: BoardDb, ws_tx: broadcast::Sender<String>, key_prefix: String) -> Self {
        Self {
            db,
            ws_tx,
            key_prefix,
            create_gate: tokio::sync::Mutex::new(()),
        }
    }
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

/// Create/edit payload: the full editable field set. Enum-valued fields
/// arrive as strings and are parsed here so every rejection flows through
/// [`BoardError`] as one message.
#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: String,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub story_points: Option<f64>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub sprint: Option<String>,
}

impl IssueRequest {
    fn into_draft(self) -> Result<IssueDraft, BoardError> {
        let issue_type = self
            .issue_type
            .ok_or(BoardError::MissingField { field: "issue_type" })?;
        let issue_type = IssueType::from_str(&issue_type).map_err(|message| {
            BoardError::InvalidValue {
                field: "issue_type",
                message,
            }
        })?;

        let priority = self
            .priority
            .ok_or(BoardError::MissingField { field: "priority" })?;
        let priority =
            Priority::from_str(&priority).map_err(|message| BoardError::InvalidValue {
                field: "priority",
                message,
            })?;

        let draft = IssueDraft {
            summary: self.summary,
            description: self.description,
            acceptance_criteria: self.acceptance_criteria,
            issue_type,
            priority,
            story_points: self.story_points,
            start_date: parse_date("start_date", self.start_date)?,
            due_date: parse_date("due_date", self.due_date)?,
            sprint: self.sprint,
        }
        .normalize();
        draft.validate()?;
        Ok(draft)
    }
}

fn parse_date(field: &'static str, value: Option<String>) -> Result<Option<NaiveDate>, BoardError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|e| BoardError::InvalidValue {
                field,
                message: e.to_string(),
            }),
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveIssueRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceIssueRequest {
    pub board: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub view: Option<String>,
    pub search: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn internal(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match &err {
            BoardError::IssueNotFound { .. } => ApiError::NotFound(err.to_string()),
            BoardError::Database(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/issues", get(list_issues).post(create_issue))
        .route(
            "/api/issues/{id}",
            get(get_issue).patch(update_issue).delete(delete_issue),
        )
        .route("/api/issues/{id}/move", patch(move_issue))
        .route("/api/issues/{id}/advance", post(advance_issue))
        .route("/api/issues/{id}/duplicate", post(duplicate_issue))
        .route("/api/board", get(get_board))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_issues(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let issues = state.db.list_issues().await.map_err(ApiError::internal)?;
    let issues = models::filter_issues(issues, query.search.as_deref().unwrap_or(""));
    Ok(Json(issues))
}

async fn create_issue(
    State(state): State<SharedState>,
    Json(req): Json<IssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = req.into_draft()?;

    // Held across derive + insert so two in-flight creates cannot read the
    // same last key.
    let _guard = state.create_gate.lock().await;
    let last_key = state.db.last_issue_key().await.map_err(ApiError::internal)?;
    let key = next_issue_key(last_key.as_deref(), &state.key_prefix);
    let issue = state
        .db
        .insert_issue(&key, &draft, IssueStatus::Backlog)
        .await
        .map_err(ApiError::internal)?;

    broadcast_message(&state.ws_tx, &WsMessage::IssueCreated { issue: issue.clone() });
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn get_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = state
        .db
        .get_issue(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(BoardError::IssueNotFound { id })?;
    Ok(Json(issue))
}

async fn update_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<IssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = req.into_draft()?;
    let issue = state
        .db
        .update_issue(id, &draft)
        .await
        .map_err(ApiError::internal)?
        .ok_or(BoardError::IssueNotFound { id })?;

    broadcast_message(&state.ws_tx, &WsMessage::IssueUpdated { issue: issue.clone() });
    Ok(Json(issue))
}

async fn delete_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .delete_issue(id)
        .await
        .map_err(ApiError::internal)?;
    if !deleted {
        return Err(BoardError::IssueNotFound { id }.into());
    }
    broadcast_message(&state.ws_tx, &WsMessage::IssueDeleted { issue_id: id });
    Ok(StatusCode::NO_CONTENT)
}

/// Direct status overwrite, the drop-target semantics. Any status may be
/// set from any other; no transition graph is enforced here.
async fn move_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<MoveIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = IssueStatus::from_str(&req.status)
        .map_err(|_| BoardError::InvalidStatus { value: req.status })?;

    let issue = state
        .db
        .get_issue(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(BoardError::IssueNotFound { id })?;
    let from_status = issue.status;

    let moved = state
        .db
        .move_issue(id, status)
        .await
        .map_err(ApiError::internal)?
        .ok_or(BoardError::IssueNotFound { id })?;

    broadcast_message(
        &state.ws_tx,
        &WsMessage::IssueMoved {
            issue_id: id,
            from_status,
            to_status: status,
        },
    );
    Ok(Json(moved))
}

/// The per-column forward action of a board view, wrapping at the last
/// column. Rejected when the issue's status is not a column of that view.
async fn advance_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<AdvanceIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = BoardKind::from_str(&req.board)
        .map_err(|_| BoardError::InvalidBoard { value: req.board })?;

    let issue = state
        .db
        .get_issue(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(BoardError::IssueNotFound { id })?;
    let from_status = issue.status;
    let to_status = board
        .advance(from_status)
        .ok_or(BoardError::NotOnBoard {
            status: from_status,
            board,
        })?;

    let moved = state
        .db
        .move_issue(id, to_status)
        .await
        .map_err(ApiError::internal)?
        .ok_or(BoardError::IssueNotFound { id })?;

    broadcast_message(
        &state.ws_tx,
        &WsMessage::IssueMoved {
            issue_id: id,
            from_status,
            to_status,
        },
    );
    Ok(Json(moved))
}

/// Copy every user field of an issue under a fresh key. The source status
/// is preserved. Duplication is not serialized by the create gate; a
/// racing key collision fails on the unique key index.
async fn duplicate_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let source = state
        .db
        .get_issue(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(BoardError::IssueNotFound { id })?;
    let draft = IssueDraft::from_issue(&source);

    let last_key = state.db.last_issue_key().await.map_err(ApiError::internal)?;
    let key = next_issue_key(last_key.as_deref(), &state.key_prefix);
    let issue = state
        .db
        .insert_issue(&key, &draft, source.status)
        .await
        .map_err(ApiError::internal)?;

    broadcast_message(&state.ws_tx, &WsMessage::IssueCreated { issue: issue.clone() });
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn get_board(
    State(state): State<SharedState>,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match query.view.as_deref() {
        Some(view) => BoardKind::from_str(view).map_err(|_| BoardError::InvalidBoard {
            value: view.to_string(),
        })?,
        None => BoardKind::Standard,
    };
    let issues = state.db.list_issues().await.map_err(ApiError::internal)?;
    let board = models::board_view(issues, kind, query.search.as_deref().unwrap_or(""));
    Ok(Json(board))
}

// ── Tests ─────────────────────────────────────────────────────────────
