use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{is_staff, require_staff, CurrentUser};
use crate::models::{Event, ModerationStatus, PublishStatus};
use crate::utils::error::AppError;

/// Review verdict to apply when an event goes (back) out to the public.
///
/// An event stays approved only if it was approved before AND its content
/// fingerprint still matches what staff signed off on. Everything else --
/// never reviewed, pending, rejected, or edited since approval -- goes to
/// the review queue. There is deliberately no shortcut for a rejected
/// event whose content is unchanged: it was never approved, so it queues
/// again.
pub fn next_moderation_status(
    current: Option<ModerationStatus>,
    approved_hash: Option<&str>,
    fresh_hash: &str,
) -> ModerationStatus {
    match (current, approved_hash) {
        (Some(ModerationStatus::Approved), Some(stored)) if stored == fresh_hash => {
            ModerationStatus::Approved
        }
        _ => ModerationStatus::Pending,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub published: bool,
    pub moderation_status: ModerationStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStatusOutcome {
    pub publish_status: PublishStatus,
    pub moderation_status: Option<ModerationStatus>,
}

async fn load_event(pool: &PgPool, event_id: Uuid) -> Result<Event, AppError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))
}

async fn authorize_owner_or_staff(
    pool: &PgPool,
    actor: &CurrentUser,
    event: &Event,
) -> Result<(), AppError> {
    if event.created_by == actor.id || is_staff(pool, actor).await? {
        return Ok(());
    }
    Err(AppError::PermissionDenied(
        "Only the event owner or staff can do this".to_string(),
    ))
}

pub async fn publish(
    pool: &PgPool,
    actor: &CurrentUser,
    event_id: Uuid,
) -> Result<PublishOutcome, AppError> {
    let event = load_event(pool, event_id).await?;
    authorize_owner_or_staff(pool, actor, &event).await?;

    let fresh_hash = event.content_fingerprint();
    let next = next_moderation_status(
        event.moderation_status,
        event.approved_hash.as_deref(),
        &fresh_hash,
    );

    sqlx::query(
        "UPDATE events
         SET publish_status = 'published', moderation_status = $1,
             submitted_at = NOW(), updated_at = NOW()
         WHERE id = $2",
    )
    .bind(next)
    .bind(event_id)
    .execute(pool)
    .await?;

    Ok(PublishOutcome {
        published: true,
        moderation_status: next,
    })
}

pub async fn set_publish_status(
    pool: &PgPool,
    actor: &CurrentUser,
    event_id: Uuid,
    publish: bool,
) -> Result<PublishStatusOutcome, AppError> {
    if publish {
        let outcome = self::publish(pool, actor, event_id).await?;
        return Ok(PublishStatusOutcome {
            publish_status: PublishStatus::Published,
            moderation_status: Some(outcome.moderation_status),
        });
    }

    let event = load_event(pool, event_id).await?;
    authorize_owner_or_staff(pool, actor, &event).await?;

    // Unpublishing leaves the review verdict alone so re-publishing
    // unchanged, previously approved content skips the queue.
    sqlx::query(
        "UPDATE events SET publish_status = 'draft', updated_at = NOW() WHERE id = $1",
    )
    .bind(event_id)
    .execute(pool)
    .await?;

    Ok(PublishStatusOutcome {
        publish_status: PublishStatus::Draft,
        moderation_status: event.moderation_status,
    })
}

pub async fn staff_set_moderation_status(
    pool: &PgPool,
    actor: &CurrentUser,
    event_id: Uuid,
    status: ModerationStatus,
    reason: Option<String>,
) -> Result<(), AppError> {
    require_staff(pool, actor).await?;
    let event = load_event(pool, event_id).await?;

    if status == ModerationStatus::Approved {
        // Snapshot exactly what was reviewed, so later edits are detected.
        let approved_hash = event.content_fingerprint();
        sqlx::query(
            "UPDATE events
             SET moderation_status = $1, moderation_reason = $2,
                 approved_hash = $3, approved_at = NOW(), updated_at = NOW()
             WHERE id = $4",
        )
        .bind(status)
        .bind(reason)
        .bind(approved_hash)
        .bind(event_id)
        .execute(pool)
        .await?;
    } else {
        sqlx::query(
            "UPDATE events
             SET moderation_status = $1, moderation_reason = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(status)
        .bind(reason)
        .bind(event_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::tests::sample_event;

    #[test]
    fn approved_with_matching_hash_stays_approved() {
        let event = sample_event();
        let hash = event.content_fingerprint();
        assert_eq!(
            next_moderation_status(Some(ModerationStatus::Approved), Some(&hash), &hash),
            ModerationStatus::Approved
        );
    }

    #[test]
    fn approved_with_stale_hash_goes_back_to_pending() {
        let mut event = sample_event();
        let approved = event.content_fingerprint();
        event.title = "Edited after approval".to_string();
        let fresh = event.content_fingerprint();
        assert_eq!(
            next_moderation_status(Some(ModerationStatus::Approved), Some(&approved), &fresh),
            ModerationStatus::Pending
        );
    }

    #[test]
    fn unreviewed_and_rejected_events_always_queue() {
        let hash = "abc123";
        assert_eq!(
            next_moderation_status(None, None, hash),
            ModerationStatus::Pending
        );
        assert_eq!(
            next_moderation_status(Some(ModerationStatus::Pending), None, hash),
            ModerationStatus::Pending
        );
        // A rejected event republished with identical content still queues:
        // there is no approval hash for it to match.
        assert_eq!(
            next_moderation_status(Some(ModerationStatus::Rejected), None, hash),
            ModerationStatus::Pending
        );
    }

    #[test]
    fn approval_hash_from_another_event_does_not_carry_over() {
        assert_eq!(
            next_moderation_status(
                Some(ModerationStatus::Approved),
                Some("hash-of-something-else"),
                "hash-of-this-event"
            ),
            ModerationStatus::Pending
        );
    }
}
