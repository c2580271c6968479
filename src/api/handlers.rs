//! HTTP request handlers

use super::types::{
    ErrorResponse, HealthResponse, ResetResponse, StatusResponse, UserDetailResponse,
    UserListResponse, WebhookPayload, WebhookVerifyQuery,
};
use super::AppState;
use crate::session::StoreError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::trace::TraceLayer;

const RECENT_LOG_ENTRIES: usize = 5;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Meta webhook
        .route("/webhook", get(webhook_verify).post(webhook_receive))
        // Liveness and overview
        .route("/health", get(health))
        .route("/status", get(status))
        // Session admin
        .route("/users", get(list_users))
        .route("/users/:identity", get(get_user))
        .route("/users/:identity/reset", post(reset_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

async fn webhook_verify(
    State(state): State<AppState>,
    Query(query): Query<WebhookVerifyQuery>,
) -> Result<String, StatusCode> {
    if query.mode.as_deref() == Some("subscribe")
        && query.verify_token.as_deref() == Some(&*state.verify_token)
    {
        tracing::info!("Webhook verified");
        Ok(query.challenge.unwrap_or_default())
    } else {
        tracing::warn!(mode = ?query.mode, "Webhook verification failed");
        Err(StatusCode::FORBIDDEN)
    }
}

/// Acknowledge at once; each guest's messages are queued in arrival order
async fn webhook_receive(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> (StatusCode, &'static str) {
    if !payload.is_business_account() {
        tracing::debug!(object = ?payload.object, "Ignoring non-WhatsApp event");
        return (StatusCode::OK, "EVENT_RECEIVED");
    }

    let messages = payload.into_messages().into_iter().filter(|m| match &m.message_id {
        Some(id) => {
            let fresh = state.seen.insert(id);
            if !fresh {
                tracing::debug!(message_id = %id, "Dropping duplicate delivery");
            }
            fresh
        }
        None => true,
    });

    for message in messages {
        state.manager.dispatch(message);
    }
    (StatusCode::OK, "EVENT_RECEIVED")
}

// ============================================================
// Liveness and overview
// ============================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let sessions = state.manager.runtime().store().list_all().await?;
    Ok(Json(StatusResponse::from_states(
        sessions.iter().map(|s| s.state),
        state.reminders_enabled,
    )))
}

// ============================================================
// Session admin
// ============================================================

async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>, AppError> {
    let now = Utc::now();
    let users: Vec<_> = state
        .manager
        .runtime()
        .store()
        .list_all()
        .await?
        .iter()
        .map(|s| s.summary(now))
        .collect();
    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}

async fn get_user(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<UserDetailResponse>, AppError> {
    let session = state
        .manager
        .runtime()
        .store()
        .get(&identity)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No session for {identity}")))?;

    let skip = session.conversation.len().saturating_sub(RECENT_LOG_ENTRIES);
    Ok(Json(UserDetailResponse {
        summary: session.summary(Utc::now()),
        reminders: session.reminders,
        timestamps: session.timestamps.clone(),
        conversation_length: session.conversation.len(),
        recent_messages: session.conversation[skip..].to_vec(),
    }))
}

async fn reset_user(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<ResetResponse>, AppError> {
    if !state.manager.runtime().store().reset(&identity).await? {
        return Err(AppError::NotFound(format!("No session for {identity}")));
    }
    tracing::info!(identity = %identity, "Session reset by admin");
    Ok(Json(ResetResponse {
        success: true,
        message: format!("User {identity} has been reset"),
    }))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(identity) => AppError::NotFound(format!("No session for {identity}")),
            other => {
                tracing::error!(error = %other, "Session store failure");
                AppError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
