use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod stripe;

pub use stripe::StripeGateway;

/// Provider-side failure. The diagnostic fields are logged server-side
/// only; they never reach API clients.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub param: Option<String>,
}

impl GatewayError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            code: None,
            param: None,
        }
    }
}

/// What the checkout orchestrator asks the gateway to host: one line item
/// with a server-computed unit amount. The metadata is the only durable
/// link between the gateway's session and our own records, so it always
/// carries the event, the buyer and the amount that was quoted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub unit_amount: i64,
    pub quantity: i64,
    pub currency: String,
    pub product_name: String,
    pub product_image: Option<String>,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct SessionLineItem {
    pub quantity: i64,
    pub unit_amount: Option<i64>,
}

/// A session as reported back by the gateway when finalizing.
#[derive(Debug, Clone, Default)]
pub struct SessionDetails {
    pub id: String,
    pub mode: String,
    pub payment_status: String,
    pub payment_intent: Option<String>,
    pub payment_intent_status: Option<String>,
    pub metadata: HashMap<String, String>,
    pub currency: Option<String>,
    pub amount_subtotal: Option<i64>,
    pub amount_total: Option<i64>,
    pub line_item: Option<SessionLineItem>,
}

impl SessionDetails {
    /// Whether money actually changed hands. The session's own paid flag
    /// is authoritative; an intent that reports success, or the bare
    /// presence of an intent reference, also counts (the gateway omits the
    /// paid flag on some legacy sessions).
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
            || self.payment_intent_status.as_deref() == Some("succeeded")
            || self.payment_intent.is_some()
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CreatedSession, GatewayError>;

    /// Returns `None` when the gateway has no such session.
    async fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionDetails>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_detection_accepts_any_payment_evidence() {
        let mut details = SessionDetails {
            payment_status: "paid".to_string(),
            ..Default::default()
        };
        assert!(details.is_paid());

        details.payment_status = "unpaid".to_string();
        assert!(!details.is_paid());

        details.payment_intent_status = Some("succeeded".to_string());
        assert!(details.is_paid());

        details.payment_intent_status = None;
        details.payment_intent = Some("pi_123".to_string());
        assert!(details.is_paid());
    }
}
