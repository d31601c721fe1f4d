use futures_util::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::utils::error::AppError;

const MAX_SERIALIZATION_ATTEMPTS: u32 = 5;

/// Postgres signals a serialization conflict between SERIALIZABLE
/// transactions with SQLSTATE 40001; the losing transaction is safe to
/// re-run from the top.
pub fn is_serialization_failure(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("40001"))
}

fn retryable(err: &AppError) -> bool {
    matches!(err, AppError::Database(db_err) if is_serialization_failure(db_err))
}

/// Runs `body` inside a SERIALIZABLE transaction, retrying the whole body
/// on serialization conflicts. Multi-row invariants (idempotent order
/// creation, the capacity check-and-decrement, counter incrementation) are
/// expressed inside one such transaction so conflicting concurrent writers
/// are forced to serialize, exactly as the document store's optimistic
/// transactions did.
pub async fn serializable<T, F>(pool: &PgPool, mut body: F) -> Result<T, AppError>
where
    F: for<'t> FnMut(
        &'t mut Transaction<'static, Postgres>,
    ) -> BoxFuture<'t, Result<T, AppError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        match body(&mut tx).await {
            Ok(value) => match tx.commit().await {
                Ok(()) => return Ok(value),
                Err(err) if is_serialization_failure(&err)
                    && attempt + 1 < MAX_SERIALIZATION_ATTEMPTS =>
                {
                    attempt += 1;
                    debug!(attempt, "Serialization conflict at commit, retrying transaction");
                }
                Err(err) => return Err(err.into()),
            },
            Err(err) => {
                let _ = tx.rollback().await;
                if retryable(&err) && attempt + 1 < MAX_SERIALIZATION_ATTEMPTS {
                    attempt += 1;
                    debug!(attempt, "Serialization conflict, retrying transaction");
                } else {
                    return Err(err);
                }
            }
        }
    }
}
