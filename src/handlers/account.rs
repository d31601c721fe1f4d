use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::auth::CurrentUser;
use crate::services::deletion;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn delete_account(
    State(state): State<AppState>,
    actor: CurrentUser,
) -> Result<Response, AppError> {
    let outcome = deletion::delete_if_no_dependencies(&state, &actor).await?;
    let message = if outcome.deleted {
        "Account deleted"
    } else {
        "Account could not be deleted"
    };
    Ok(success(outcome, message).into_response())
}
