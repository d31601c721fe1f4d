use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::{ModerationStatus, Role};
use crate::services::{admin, deletion, moderation};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetModerationStatusRequest {
    pub moderation_status: ModerationStatus,
    pub reason: Option<String>,
}

pub async fn set_moderation_status(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(body): Json<SetModerationStatusRequest>,
) -> Result<Response, AppError> {
    moderation::staff_set_moderation_status(
        &state.pool,
        &actor,
        event_id,
        body.moderation_status,
        body.reason,
    )
    .await?;
    Ok(success(serde_json::json!({ "ok": true }), "Moderation status updated").into_response())
}

pub async fn staff_delete_event(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let outcome = deletion::staff_cascade_delete_event(&state, &actor, event_id).await?;
    Ok(success(outcome, "Event and its orders deleted").into_response())
}

pub async fn staff_delete_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let outcome = deletion::staff_delete_user_cascade(&state, &actor, user_id).await?;
    Ok(success(outcome, "User and their records deleted").into_response())
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

pub async fn set_user_role(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Response, AppError> {
    let outcome = admin::staff_set_user_role(&state, &actor, user_id, body.role).await?;
    Ok(success(outcome, "Role updated").into_response())
}

#[derive(Deserialize)]
pub struct SetBlockedRequest {
    pub blocked: bool,
}

pub async fn set_user_blocked(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetBlockedRequest>,
) -> Result<Response, AppError> {
    let outcome = admin::staff_set_user_blocked(&state, &actor, user_id, body.blocked).await?;
    Ok(success(outcome, "Blocked flag updated").into_response())
}

pub async fn backfill_profile_emails(
    State(state): State<AppState>,
    actor: CurrentUser,
) -> Result<Response, AppError> {
    let outcome = admin::staff_backfill_profile_emails(&state, &actor).await?;
    Ok(success(outcome, "Profile emails backfilled").into_response())
}
