use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::auth::CurrentUser;
use crate::services::checkout::{self, CreateCheckoutSessionInput};
use crate::services::orders::{self, CreateFreeOrderInput};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn create_checkout_session(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(body): Json<CreateCheckoutSessionInput>,
) -> Result<Response, AppError> {
    let created = checkout::create_checkout_session(&state, &actor, body).await?;
    Ok(success(created, "Checkout session created").into_response())
}

pub async fn finalize_checkout_session(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let outcome = orders::finalize_checkout_session(&state, &actor, &session_id).await?;
    let message = if outcome.created {
        "Order created"
    } else {
        "Order already finalized"
    };
    Ok(success(outcome, message).into_response())
}

pub async fn create_free_order(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(body): Json<CreateFreeOrderInput>,
) -> Result<Response, AppError> {
    let outcome = orders::create_free_order(&state, &actor, body).await?;
    Ok(success(outcome, "Order confirmed").into_response())
}
