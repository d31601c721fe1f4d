use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{require_staff, CurrentUser};
use crate::identity::IdentityDirectory;
use crate::models::Role;
use crate::state::AppState;
use crate::utils::error::AppError;

#[derive(Debug, Serialize)]
pub struct RoleUpdated {
    pub ok: bool,
    pub role: Role,
}

pub async fn staff_set_user_role(
    state: &AppState,
    actor: &CurrentUser,
    user_id: Uuid,
    role: Role,
) -> Result<RoleUpdated, AppError> {
    require_staff(&state.pool, actor).await?;

    let updated = sqlx::query("UPDATE profiles SET role = $1, updated_at = NOW() WHERE id = $2")
        .bind(role)
        .bind(user_id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound(format!("Profile {} not found", user_id)));
    }

    info!(user = %user_id, ?role, "User role updated");
    Ok(RoleUpdated { ok: true, role })
}

#[derive(Debug, Serialize)]
pub struct BlockedUpdated {
    pub ok: bool,
    pub blocked: bool,
}

/// Blocking mirrors to the identity provider's disabled flag, so a blocked
/// user cannot obtain fresh tokens. Request handlers never re-check the
/// flag themselves.
pub async fn staff_set_user_blocked(
    state: &AppState,
    actor: &CurrentUser,
    user_id: Uuid,
    blocked: bool,
) -> Result<BlockedUpdated, AppError> {
    require_staff(&state.pool, actor).await?;

    let updated =
        sqlx::query("UPDATE profiles SET blocked = $1, updated_at = NOW() WHERE id = $2")
            .bind(blocked)
            .bind(user_id)
            .execute(&state.pool)
            .await?
            .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound(format!("Profile {} not found", user_id)));
    }

    state.identity.set_disabled(user_id, blocked).await?;

    info!(user = %user_id, blocked, "User blocked flag updated");
    Ok(BlockedUpdated { ok: true, blocked })
}

#[derive(Debug, Serialize)]
pub struct BackfillResult {
    pub ok: bool,
    pub updated: u64,
}

/// One-off maintenance: copy email addresses from the identity directory
/// onto profiles that predate the email column.
pub async fn staff_backfill_profile_emails(
    state: &AppState,
    actor: &CurrentUser,
) -> Result<BackfillResult, AppError> {
    require_staff(&state.pool, actor).await?;

    let users = state.identity.list_users().await?;
    let mut updated = 0;
    for user in users {
        let Some(email) = user.email else {
            continue;
        };
        let result = sqlx::query(
            "UPDATE profiles SET email = $1, updated_at = NOW()
             WHERE id = $2 AND (email IS NULL OR email = '')",
        )
        .bind(&email)
        .bind(user.id)
        .execute(&state.pool)
        .await?;
        updated += result.rows_affected();
    }

    info!(updated, "Profile email backfill complete");
    Ok(BackfillResult { ok: true, updated })
}
