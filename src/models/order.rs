use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::event::PriceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Payment completed and inventory was decremented.
    Paid,
    /// Payment completed but the event filled up between session creation
    /// and finalization. Inventory untouched; needs manual resolution.
    PaidOverCapacity,
    /// Free order, no payment involved.
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    None,
}

/// An order is written exactly once, inside the same transaction that
/// adjusts event inventory, and never updated afterward. Paid orders use
/// the gateway session id as `id`, which is the finalization idempotency
/// key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: String,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
    pub currency: String,
    pub price_type: PriceType,
    pub status: OrderStatus,
    pub payment_provider: PaymentProvider,
    pub payment_status: String,
    pub order_code: String,
    pub created_at: DateTime<Utc>,
}

/// Human-readable order number, zero-padded so codes sort lexically.
pub fn format_order_code(value: i64) -> String {
    format!("{:06}", value)
}
