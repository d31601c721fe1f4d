use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::services::{deletion, moderation};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn publish_event(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let outcome = moderation::publish(&state.pool, &actor, event_id).await?;
    Ok(success(outcome, "Event published").into_response())
}

#[derive(Deserialize)]
pub struct SetPublishStatusRequest {
    pub publish: bool,
}

pub async fn set_publish_status(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(event_id): Path<Uuid>,
    Json(body): Json<SetPublishStatusRequest>,
) -> Result<Response, AppError> {
    let outcome =
        moderation::set_publish_status(&state.pool, &actor, event_id, body.publish).await?;
    Ok(success(outcome, "Publish status updated").into_response())
}

pub async fn creator_delete_event(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let outcome = deletion::creator_delete_event_safely(&state, &actor, event_id).await?;
    let message = if outcome.deleted {
        "Event deleted"
    } else {
        "Event could not be deleted"
    };
    Ok(success(outcome, message).into_response())
}
