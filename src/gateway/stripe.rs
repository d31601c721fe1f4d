use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    CreatedSession, GatewayError, PaymentGateway, SessionDetails, SessionLineItem, SessionRequest,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe-hosted checkout over the REST API. Create uses the
/// form-encoded surface; retrieve expands line items and the payment
/// intent in one call.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            base_url: STRIPE_API_BASE.to_string(),
        }
    }

    async fn parse_error(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        match response.json::<StripeErrorEnvelope>().await {
            Ok(envelope) => GatewayError {
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("Stripe returned {}", status)),
                error_type: envelope.error.error_type,
                code: envelope.error.code,
                param: envelope.error.param,
            },
            Err(_) => GatewayError::message(format!("Stripe returned {}", status)),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CreatedSession, GatewayError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("line_items[0][quantity]".into(), request.quantity.to_string()),
            (
                "line_items[0][price_data][currency]".into(),
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                request.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                request.product_name.clone(),
            ),
            ("metadata[eventId]".into(), request.event_id.to_string()),
            ("metadata[userId]".into(), request.user_id.to_string()),
            (
                "metadata[unitAmountMinor]".into(),
                request.unit_amount.to_string(),
            ),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
        ];
        if let Some(image) = &request.product_image {
            form.push((
                "line_items[0][price_data][product_data][images][0]".into(),
                image.clone(),
            ));
        }

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::message(format!("Stripe request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let session: StripeSession = response
            .json()
            .await
            .map_err(|e| GatewayError::message(format!("Malformed Stripe response: {e}")))?;
        let url = session
            .url
            .ok_or_else(|| GatewayError::message("Stripe session has no redirect URL"))?;
        Ok(CreatedSession {
            id: session.id,
            url,
        })
    }

    async fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionDetails>, GatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.base_url, session_id
            ))
            .query(&[
                ("expand[]", "line_items"),
                ("expand[]", "payment_intent"),
            ])
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| GatewayError::message(format!("Stripe request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let session: StripeSession = response
            .json()
            .await
            .map_err(|e| GatewayError::message(format!("Malformed Stripe response: {e}")))?;
        Ok(Some(session.into()))
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
    param: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    payment_intent: Option<Expandable<StripePaymentIntent>>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    amount_subtotal: Option<i64>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    line_items: Option<StripeList<StripeLineItem>>,
}

/// Expanded fields come back as objects, unexpanded ones as bare ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expandable<T> {
    Id(String),
    Object(T),
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct StripeList<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeLineItem {
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    #[serde(default)]
    unit_amount: Option<i64>,
}

impl From<StripeSession> for SessionDetails {
    fn from(session: StripeSession) -> Self {
        let (payment_intent, payment_intent_status) = match session.payment_intent {
            Some(Expandable::Id(id)) => (Some(id), None),
            Some(Expandable::Object(intent)) => (Some(intent.id), intent.status),
            None => (None, None),
        };
        let line_item = session.line_items.and_then(|list| {
            list.data.into_iter().next().map(|item| SessionLineItem {
                quantity: item.quantity.unwrap_or(1),
                unit_amount: item.price.and_then(|p| p.unit_amount),
            })
        });
        SessionDetails {
            id: session.id,
            mode: session.mode.unwrap_or_default(),
            payment_status: session.payment_status.unwrap_or_default(),
            payment_intent,
            payment_intent_status,
            metadata: session.metadata.unwrap_or_default(),
            currency: session.currency,
            amount_subtotal: session.amount_subtotal,
            amount_total: session.amount_total,
            line_item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expanded_session_payload_maps_to_details() {
        let raw = serde_json::json!({
            "id": "cs_test_123",
            "mode": "payment",
            "payment_status": "paid",
            "payment_intent": { "id": "pi_123", "status": "succeeded" },
            "metadata": {
                "eventId": "5b8a58a6-90ae-43f2-8b0f-9bc54f3f7d5a",
                "userId": "e5a7c8aa-6f17-4f0f-b2a3-4f2d1a9be111",
                "unitAmountMinor": "1250"
            },
            "currency": "usd",
            "amount_subtotal": 2500,
            "amount_total": 2500,
            "line_items": {
                "data": [
                    { "quantity": 2, "price": { "unit_amount": 1250 } }
                ]
            }
        });
        let session: StripeSession = serde_json::from_value(raw).unwrap();
        let details: SessionDetails = session.into();

        assert_eq!(details.id, "cs_test_123");
        assert_eq!(details.mode, "payment");
        assert!(details.is_paid());
        assert_eq!(details.payment_intent.as_deref(), Some("pi_123"));
        assert_eq!(details.metadata["unitAmountMinor"], "1250");
        let line_item = details.line_item.unwrap();
        assert_eq!(line_item.quantity, 2);
        assert_eq!(line_item.unit_amount, Some(1250));
    }

    #[test]
    fn unexpanded_payment_intent_keeps_the_bare_id() {
        let raw = serde_json::json!({
            "id": "cs_test_456",
            "payment_intent": "pi_456"
        });
        let session: StripeSession = serde_json::from_value(raw).unwrap();
        let details: SessionDetails = session.into();
        assert_eq!(details.payment_intent.as_deref(), Some("pi_456"));
        assert_eq!(details.payment_intent_status, None);
    }

    #[test]
    fn error_envelope_carries_provider_diagnostics() {
        let raw = serde_json::json!({
            "error": {
                "message": "Amount must be at least 30 pence",
                "type": "invalid_request_error",
                "code": "amount_too_small",
                "param": "unit_amount"
            }
        });
        let envelope: StripeErrorEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(envelope.error.code.as_deref(), Some("amount_too_small"));
        assert_eq!(envelope.error.param.as_deref(), Some("unit_amount"));
    }
}
