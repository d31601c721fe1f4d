use std::collections::HashSet;

use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{load_profile, require_staff, CurrentUser};
use crate::identity::IdentityDirectory;
use crate::models::{Event, PublishStatus, Role};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::DeletionOutcome;

/// The store caps batched writes; deletes run in id chunks of this size,
/// looping until the working set is exhausted.
pub const DELETE_BATCH_SIZE: usize = 500;

pub fn batch_count(ids: usize) -> usize {
    ids.div_ceil(DELETE_BATCH_SIZE)
}

async fn delete_orders_by_id(pool: &PgPool, ids: &[String]) -> Result<u64, AppError> {
    let mut deleted = 0;
    for chunk in ids.chunks(DELETE_BATCH_SIZE) {
        let result = sqlx::query("DELETE FROM orders WHERE id = ANY($1)")
            .bind(chunk)
            .execute(pool)
            .await?;
        deleted += result.rows_affected();
    }
    Ok(deleted)
}

async fn delete_events_by_id(pool: &PgPool, ids: &[Uuid]) -> Result<u64, AppError> {
    let mut deleted = 0;
    for chunk in ids.chunks(DELETE_BATCH_SIZE) {
        let result = sqlx::query("DELETE FROM events WHERE id = ANY($1)")
            .bind(chunk)
            .execute(pool)
            .await?;
        deleted += result.rows_affected();
    }
    Ok(deleted)
}

async fn order_ids_for_event(pool: &PgPool, event_id: Uuid) -> Result<Vec<String>, AppError> {
    Ok(
        sqlx::query_scalar::<_, String>("SELECT id FROM orders WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(pool)
            .await?,
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCascadeSummary {
    pub events_deleted: u64,
    pub orders_deleted: u64,
    pub profile_deleted: bool,
    pub auth_deleted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCascadeOutcome {
    pub deleted: bool,
    pub summary: UserCascadeSummary,
}

/// Removes a user and everything that references them: their own orders,
/// their events, and orders other users placed on those events. The store
/// has no foreign-key cascades, so this walks the references itself. Not
/// resumable: a crash mid-way leaves a partial cascade.
pub async fn staff_delete_user_cascade(
    state: &AppState,
    actor: &CurrentUser,
    target_user_id: Uuid,
) -> Result<UserCascadeOutcome, AppError> {
    require_staff(&state.pool, actor).await?;

    let event_ids: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM events WHERE created_by = $1")
            .bind(target_user_id)
            .fetch_all(&state.pool)
            .await?;

    let own_order_ids: Vec<String> =
        sqlx::query_scalar("SELECT id FROM orders WHERE user_id = $1")
            .bind(target_user_id)
            .fetch_all(&state.pool)
            .await?;

    let event_order_ids: Vec<String> =
        sqlx::query_scalar("SELECT id FROM orders WHERE event_id = ANY($1)")
            .bind(&event_ids)
            .fetch_all(&state.pool)
            .await?;

    // An order can be both owned by the target and placed on the target's
    // event; dedupe so it is only deleted (and counted) once.
    let order_ids: Vec<String> = own_order_ids
        .into_iter()
        .chain(event_order_ids)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let orders_deleted = delete_orders_by_id(&state.pool, &order_ids).await?;
    let events_deleted = delete_events_by_id(&state.pool, &event_ids).await?;

    let profile_deleted = sqlx::query("DELETE FROM profiles WHERE id = $1")
        .bind(target_user_id)
        .execute(&state.pool)
        .await?
        .rows_affected()
        > 0;

    // Already-absent identities are fine; the account is gone either way.
    state.identity.delete_user(target_user_id).await?;

    info!(
        target_user = %target_user_id,
        events_deleted,
        orders_deleted,
        "User cascade deletion complete"
    );

    Ok(UserCascadeOutcome {
        deleted: true,
        summary: UserCascadeSummary {
            events_deleted,
            orders_deleted,
            profile_deleted,
            auth_deleted: true,
        },
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCascadeOutcome {
    pub deleted: bool,
    pub orders_deleted: u64,
}

pub async fn staff_cascade_delete_event(
    state: &AppState,
    actor: &CurrentUser,
    event_id: Uuid,
) -> Result<EventCascadeOutcome, AppError> {
    require_staff(&state.pool, actor).await?;

    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound(format!("Event {} not found", event_id)));
    }

    let order_ids = order_ids_for_event(&state.pool, event_id).await?;
    let orders_deleted = delete_orders_by_id(&state.pool, &order_ids).await?;

    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&state.pool)
        .await?;

    info!(event = %event_id, orders_deleted, "Event cascade deletion complete");

    Ok(EventCascadeOutcome {
        deleted: true,
        orders_deleted,
    })
}

/// Owner-facing deletion. Staff may delete any event here; a non-staff
/// owner may only delete an unpublished event, and only when no orders
/// reference it. The has-orders case is an expected outcome the UI must
/// explain, so it comes back as a structured block rather than an error.
pub async fn creator_delete_event_safely(
    state: &AppState,
    actor: &CurrentUser,
    event_id: Uuid,
) -> Result<DeletionOutcome, AppError> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

    let staff = load_profile(&state.pool, actor.id)
        .await?
        .map(|p| p.role == Role::Staff)
        .unwrap_or(false);

    if !staff {
        if event.created_by != actor.id {
            return Err(AppError::PermissionDenied(
                "Only the event owner or staff can delete this event".to_string(),
            ));
        }
        if event.publish_status == PublishStatus::Published {
            return Err(AppError::PermissionDenied(
                "Unpublish the event before deleting it".to_string(),
            ));
        }

        let order_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&state.pool)
                .await?;
        if order_count > 0 {
            return Ok(DeletionOutcome::blocked(
                "Event has orders and cannot be deleted",
                Some(json!({ "orders": order_count })),
            ));
        }
    }

    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&state.pool)
        .await?;

    Ok(DeletionOutcome::deleted())
}

/// Self-service account deletion. Owning any event or order blocks it, so
/// paid orders and live events are never silently orphaned.
pub async fn delete_if_no_dependencies(
    state: &AppState,
    actor: &CurrentUser,
) -> Result<DeletionOutcome, AppError> {
    let events_owned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE created_by = $1")
            .bind(actor.id)
            .fetch_one(&state.pool)
            .await?;
    let orders_owned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(actor.id)
            .fetch_one(&state.pool)
            .await?;

    if events_owned > 0 || orders_owned > 0 {
        return Ok(DeletionOutcome::blocked(
            "Account still owns events or orders",
            Some(json!({ "events": events_owned, "orders": orders_owned })),
        ));
    }

    sqlx::query("DELETE FROM profiles WHERE id = $1")
        .bind(actor.id)
        .execute(&state.pool)
        .await?;

    state.identity.delete_user(actor.id).await?;

    Ok(DeletionOutcome::deleted())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_count_matches_the_store_write_limit() {
        assert_eq!(batch_count(0), 0);
        assert_eq!(batch_count(1), 1);
        assert_eq!(batch_count(500), 1);
        assert_eq!(batch_count(501), 2);
        assert_eq!(batch_count(1500), 3);
    }

    #[test]
    fn union_of_order_ids_is_deduplicated() {
        let own = vec!["a".to_string(), "b".to_string()];
        let on_events = vec!["b".to_string(), "c".to_string()];
        let merged: HashSet<String> = own.into_iter().chain(on_events).collect();
        assert_eq!(merged.len(), 3);
    }
}
