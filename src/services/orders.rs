use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db;
use crate::gateway::{PaymentGateway, SessionDetails};
use crate::models::order::format_order_code;
use crate::models::{Event, Order, OrderStatus, PaymentProvider};
use crate::state::AppState;
use crate::utils::error::AppError;

use super::checkout::{quantity_in_range, MAX_TICKETS_PER_ORDER};

/// Amounts as settled by the gateway, derived before the transaction
/// starts. Line-item data is authoritative; session-level subtotals and
/// the quoted amount from the session metadata are fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedPayment {
    pub quantity: i64,
    pub unit_amount: i64,
    pub total: i64,
    pub currency: Option<String>,
    pub payment_status: String,
}

pub fn derive_payment(details: &SessionDetails) -> Result<DerivedPayment, AppError> {
    let quantity = details
        .line_item
        .as_ref()
        .map(|item| item.quantity)
        .filter(|q| *q > 0)
        .unwrap_or(1);

    let unit_amount = details
        .line_item
        .as_ref()
        .and_then(|item| item.unit_amount)
        .or_else(|| details.amount_subtotal.map(|subtotal| subtotal / quantity))
        .or_else(|| {
            details
                .metadata
                .get("unitAmountMinor")
                .and_then(|raw| raw.parse().ok())
        })
        .ok_or_else(|| {
            AppError::FailedPrecondition("Unable to determine the amount paid".to_string())
        })?;

    let total = details.amount_total.unwrap_or(unit_amount * quantity);

    let payment_status = if details.payment_status.is_empty() {
        "paid".to_string()
    } else {
        details.payment_status.clone()
    };

    Ok(DerivedPayment {
        quantity,
        unit_amount,
        total,
        currency: details.currency.clone(),
        payment_status,
    })
}

/// The session metadata is the only durable link from a gateway session
/// back to our records; its absence is a hard failure, not a fallback.
pub fn session_parties(details: &SessionDetails) -> Result<(Uuid, Uuid), AppError> {
    let event_id = details
        .metadata
        .get("eventId")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| {
            AppError::FailedPrecondition(
                "Checkout session metadata is missing the event reference".to_string(),
            )
        })?;
    let user_id = details
        .metadata
        .get("userId")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| {
            AppError::FailedPrecondition(
                "Checkout session metadata is missing the buyer reference".to_string(),
            )
        })?;
    Ok((event_id, user_id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityDecision {
    /// Enough tickets remained; inventory moves to `next_sold`.
    Within { next_sold: i32 },
    /// The event filled up after the session was created. The payment
    /// already went through, so the order is recorded as over-capacity for
    /// manual refund/resolution instead of being dropped.
    Exceeded,
}

pub fn decide_capacity(capacity: i32, tickets_sold: i32, quantity: i32) -> CapacityDecision {
    let remaining = (i64::from(capacity) - i64::from(tickets_sold)).max(0);
    if remaining >= i64::from(quantity) {
        CapacityDecision::Within {
            next_sold: tickets_sold + quantity,
        }
    } else {
        CapacityDecision::Exceeded
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOutcome {
    pub created: bool,
    pub order: Order,
}

/// Converts a completed payment session into exactly one order and at most
/// one inventory decrement. The order keyed by session id is the
/// idempotency anchor; the SERIALIZABLE transaction makes the capacity
/// check-and-decrement race-free across concurrent finalizations.
pub async fn finalize_checkout_session(
    state: &AppState,
    actor: &CurrentUser,
    session_id: &str,
) -> Result<FinalizeOutcome, AppError> {
    let details = state
        .gateway
        .retrieve_session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Checkout session not found".to_string()))?;

    if details.mode != "payment" || !details.is_paid() {
        return Err(AppError::FailedPrecondition(
            "Checkout session is not a completed payment".to_string(),
        ));
    }

    let (event_id, session_user) = session_parties(&details)?;
    if session_user != actor.id {
        return Err(AppError::PermissionDenied(
            "Checkout session belongs to another account".to_string(),
        ));
    }

    let payment = derive_payment(&details)?;
    let actor_id = actor.id;
    let session_key = session_id.to_string();

    db::serializable(&state.pool, move |tx| {
        let session_key = session_key.clone();
        let payment = payment.clone();
        Box::pin(async move {
            if let Some(existing) =
                sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
                    .bind(&session_key)
                    .fetch_optional(&mut **tx)
                    .await?
            {
                return Ok(FinalizeOutcome {
                    created: false,
                    order: existing,
                });
            }

            let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
                .bind(event_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

            let decision =
                decide_capacity(event.capacity, event.tickets_sold, payment.quantity as i32);
            let status = match decision {
                CapacityDecision::Within { .. } => OrderStatus::Paid,
                CapacityDecision::Exceeded => OrderStatus::PaidOverCapacity,
            };

            let code_value: i64 = sqlx::query_scalar(
                "UPDATE order_counters SET value = value + 1 WHERE id = 'orders' RETURNING value",
            )
            .fetch_one(&mut **tx)
            .await?;

            let order = sqlx::query_as::<_, Order>(
                "INSERT INTO orders
                    (id, event_id, user_id, quantity, unit_price, total, currency,
                     price_type, status, payment_provider, payment_status, order_code)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                 RETURNING *",
            )
            .bind(&session_key)
            .bind(event.id)
            .bind(actor_id)
            .bind(payment.quantity as i32)
            .bind(payment.unit_amount)
            .bind(payment.total)
            .bind(payment.currency.unwrap_or_else(|| event.currency.clone()))
            .bind(event.price_type)
            .bind(status)
            .bind(PaymentProvider::Stripe)
            .bind(&payment.payment_status)
            .bind(format_order_code(code_value))
            .fetch_one(&mut **tx)
            .await?;

            if let CapacityDecision::Within { next_sold } = decision {
                sqlx::query("UPDATE events SET tickets_sold = $1, updated_at = NOW() WHERE id = $2")
                    .bind(next_sold)
                    .bind(event.id)
                    .execute(&mut **tx)
                    .await?;
            }

            Ok(FinalizeOutcome {
                created: true,
                order,
            })
        })
    })
    .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFreeOrderInput {
    pub event_id: Uuid,
    pub quantity: i64,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeOrderOutcome {
    pub order_id: String,
    pub order: Order,
}

/// Free/pay-nothing counterpart of finalization: same transaction
/// discipline, no gateway round-trip. There is no session id to key on, so
/// a rapid duplicate submit can create two orders; callers that need
/// dedupe must serialize on their side.
pub async fn create_free_order(
    state: &AppState,
    actor: &CurrentUser,
    input: CreateFreeOrderInput,
) -> Result<FreeOrderOutcome, AppError> {
    if !quantity_in_range(input.quantity) {
        return Err(AppError::InvalidArgument(format!(
            "Quantity must be between 1 and {}",
            MAX_TICKETS_PER_ORDER
        )));
    }

    let actor_id = actor.id;
    let event_id = input.event_id;
    let quantity = input.quantity as i32;
    let currency_override = input.currency.map(|c| c.to_lowercase());

    db::serializable(&state.pool, move |tx| {
        let currency_override = currency_override.clone();
        Box::pin(async move {
            let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
                .bind(event_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

            if !event.is_purchasable() {
                return Err(AppError::FailedPrecondition(
                    "Event is not open for ticket sales".to_string(),
                ));
            }

            let allowed = event.remaining_capacity().min(MAX_TICKETS_PER_ORDER);
            if i64::from(quantity) > allowed {
                return Err(AppError::FailedPrecondition(
                    "Not enough tickets remaining".to_string(),
                ));
            }

            let code_value: i64 = sqlx::query_scalar(
                "UPDATE order_counters SET value = value + 1 WHERE id = 'orders' RETURNING value",
            )
            .fetch_one(&mut **tx)
            .await?;

            let order_id = Uuid::new_v4().to_string();
            let order = sqlx::query_as::<_, Order>(
                "INSERT INTO orders
                    (id, event_id, user_id, quantity, unit_price, total, currency,
                     price_type, status, payment_provider, payment_status, order_code)
                 VALUES ($1, $2, $3, $4, 0, 0, $5, $6, $7, $8, 'none', $9)
                 RETURNING *",
            )
            .bind(&order_id)
            .bind(event.id)
            .bind(actor_id)
            .bind(quantity)
            .bind(currency_override.unwrap_or_else(|| event.currency.clone()))
            .bind(event.price_type)
            .bind(OrderStatus::Confirmed)
            .bind(PaymentProvider::None)
            .bind(format_order_code(code_value))
            .fetch_one(&mut **tx)
            .await?;

            sqlx::query(
                "UPDATE events SET tickets_sold = tickets_sold + $1, updated_at = NOW()
                 WHERE id = $2",
            )
            .bind(quantity)
            .bind(event.id)
            .execute(&mut **tx)
            .await?;

            Ok(FreeOrderOutcome {
                order_id: order.id.clone(),
                order,
            })
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SessionLineItem;
    use std::collections::HashMap;

    fn paid_session(event_id: Uuid, user_id: Uuid) -> SessionDetails {
        let mut metadata = HashMap::new();
        metadata.insert("eventId".to_string(), event_id.to_string());
        metadata.insert("userId".to_string(), user_id.to_string());
        metadata.insert("unitAmountMinor".to_string(), "1250".to_string());
        SessionDetails {
            id: "cs_test_1".to_string(),
            mode: "payment".to_string(),
            payment_status: "paid".to_string(),
            payment_intent: Some("pi_1".to_string()),
            payment_intent_status: Some("succeeded".to_string()),
            metadata,
            currency: Some("usd".to_string()),
            amount_subtotal: Some(2500),
            amount_total: Some(2500),
            line_item: Some(SessionLineItem {
                quantity: 2,
                unit_amount: Some(1250),
            }),
        }
    }

    #[test]
    fn payment_derivation_prefers_line_item_data() {
        let details = paid_session(Uuid::new_v4(), Uuid::new_v4());
        let payment = derive_payment(&details).unwrap();
        assert_eq!(payment.quantity, 2);
        assert_eq!(payment.unit_amount, 1250);
        assert_eq!(payment.total, 2500);
        assert_eq!(payment.payment_status, "paid");
    }

    #[test]
    fn payment_derivation_falls_back_to_subtotal_then_metadata() {
        let mut details = paid_session(Uuid::new_v4(), Uuid::new_v4());
        details.line_item = None;

        // No line items: amount_subtotal over the default quantity of 1.
        let payment = derive_payment(&details).unwrap();
        assert_eq!(payment.quantity, 1);
        assert_eq!(payment.unit_amount, 2500);
        assert_eq!(payment.total, 2500);

        // No subtotal either: the quoted amount from the metadata.
        details.amount_subtotal = None;
        details.amount_total = None;
        let payment = derive_payment(&details).unwrap();
        assert_eq!(payment.unit_amount, 1250);
        assert_eq!(payment.total, 1250);

        // Nothing to derive from at all is a failed precondition.
        details.metadata.remove("unitAmountMinor");
        assert!(matches!(
            derive_payment(&details),
            Err(AppError::FailedPrecondition(_))
        ));
    }

    #[test]
    fn total_falls_back_to_unit_times_quantity() {
        let mut details = paid_session(Uuid::new_v4(), Uuid::new_v4());
        details.amount_total = None;
        let payment = derive_payment(&details).unwrap();
        assert_eq!(payment.total, 2500);
    }

    #[test]
    fn missing_metadata_is_a_hard_failure() {
        let mut details = paid_session(Uuid::new_v4(), Uuid::new_v4());
        details.metadata.remove("eventId");
        assert!(matches!(
            session_parties(&details),
            Err(AppError::FailedPrecondition(_))
        ));

        let mut details = paid_session(Uuid::new_v4(), Uuid::new_v4());
        details.metadata.remove("userId");
        assert!(matches!(
            session_parties(&details),
            Err(AppError::FailedPrecondition(_))
        ));

        let event_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let details = paid_session(event_id, user_id);
        assert_eq!(session_parties(&details).unwrap(), (event_id, user_id));
    }

    #[test]
    fn capacity_decision_decrements_only_within_capacity() {
        assert_eq!(
            decide_capacity(100, 98, 2),
            CapacityDecision::Within { next_sold: 100 }
        );
        assert_eq!(decide_capacity(100, 99, 2), CapacityDecision::Exceeded);
        assert_eq!(decide_capacity(100, 100, 1), CapacityDecision::Exceeded);
        // Already oversold: remaining floors at zero rather than going
        // negative, and any further purchase is over capacity.
        assert_eq!(decide_capacity(100, 103, 1), CapacityDecision::Exceeded);
        assert_eq!(
            decide_capacity(5, 0, 5),
            CapacityDecision::Within { next_sold: 5 }
        );
    }
}
