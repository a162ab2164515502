//! HTTP handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use standup_core::sync::{
    CommitRequest, CommitResponse, ErrorResponse, HealthResponse, MeResponse,
};
use standup_core::models::duration::MAX_DURATION_MINUTES;
use standup_core::WorkItem;

use super::auth::AuthUser;
use super::storage::ServerStorageError;
use super::AppState;

/// Storage failure surfaced as a 500 JSON body.
pub struct ApiError(ServerStorageError);

impl From<ServerStorageError> for ApiError {
    fn from(e: ServerStorageError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("Storage error: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "storage_error".to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    date: NaiveDate,
}

/// Health check endpoint (no auth required)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get current user info (auth required)
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        group_id: user.group_id,
    })
}

/// The caller's work items for one day.
pub async fn list_work_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<WorkItem>>, ApiError> {
    let items = state.store.list_for_user(&user.user_id, query.date).await?;
    Ok(Json(items))
}

/// Every group member's work items for one day.
pub async fn team_work_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<WorkItem>>, ApiError> {
    let items = state
        .store
        .list_for_group(&user.group_id, query.date)
        .await?;
    Ok(Json(items))
}

/// Applies a batch of added, updated and deleted work items.
///
/// Invalid records are skipped and left out of the acknowledgement; the rest
/// of the batch is still stored.
pub async fn commit_work_items(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(changes): Json<CommitRequest>,
) -> Result<Json<CommitResponse>, ApiError> {
    let (changes, skipped) = split_invalid(changes);
    for message in &skipped {
        tracing::info!("Skipped work item from {}: {}", user.user_id, message);
    }

    let acks = state
        .store
        .commit(&user.user_id, &user.group_id, &changes)
        .await?;

    tracing::info!(
        "Committed {} added, {} updated, {} deleted for {}",
        changes.added.len(),
        changes.updated.len(),
        changes.deleted.len(),
        user.user_id
    );

    let response = CommitResponse::accepted(acks);
    if skipped.is_empty() {
        Ok(Json(response))
    } else {
        Ok(Json(response.with_message(skipped.join("; "))))
    }
}

/// Drops records the store must not hold, returning why each was dropped.
fn split_invalid(changes: CommitRequest) -> (CommitRequest, Vec<String>) {
    let mut skipped = Vec::new();
    let mut keep = |item: &WorkItem| match validate(item) {
        Ok(()) => true,
        Err(message) => {
            skipped.push(message);
            false
        }
    };

    let added = changes.added.into_iter().filter(|item| keep(item)).collect();
    let updated = changes.updated.into_iter().filter(|item| keep(item)).collect();

    let changes = CommitRequest {
        added,
        updated,
        deleted: changes.deleted,
    };
    (changes, skipped)
}

fn validate(item: &WorkItem) -> Result<(), String> {
    if item.client_id.is_empty() {
        return Err("work item without clientId".to_string());
    }
    if item.task.name.trim().is_empty() {
        return Err(format!("work item {} has an empty task name", item.client_id));
    }
    if item.duration_minutes > MAX_DURATION_MINUTES {
        return Err(format!(
            "work item {} exceeds {} minutes",
            item.client_id, MAX_DURATION_MINUTES
        ));
    }
    Ok(())
}
