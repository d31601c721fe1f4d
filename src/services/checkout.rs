use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::gateway::{PaymentGateway, SessionRequest};
use crate::models::Event;
use crate::state::AppState;
use crate::utils::error::AppError;

pub const MAX_TICKETS_PER_ORDER: i64 = 10;

/// Below these per-unit amounts (minor units) the gateway rejects the
/// charge or fees swallow it.
const MINIMUM_CHARGES: &[(&str, i64)] = &[("usd", 50), ("eur", 50), ("gbp", 30)];
const DEFAULT_MINIMUM_CHARGE: i64 = 50;

pub fn minimum_charge(currency: &str) -> i64 {
    MINIMUM_CHARGES
        .iter()
        .find(|(code, _)| *code == currency)
        .map(|(_, min)| *min)
        .unwrap_or(DEFAULT_MINIMUM_CHARGE)
}

pub fn quantity_in_range(quantity: i64) -> bool {
    (1..=MAX_TICKETS_PER_ORDER).contains(&quantity)
}

/// The price the buyer will be charged per ticket, in minor units. The
/// client never supplies a price directly; a positive override is only
/// honored for the pay-what-you-want flow, and fixed-price events always
/// charge the stored price.
pub fn resolve_unit_amount(
    price: Option<Decimal>,
    override_unit_amount: Option<i64>,
) -> Result<i64, AppError> {
    if let Some(amount) = override_unit_amount.filter(|amount| *amount > 0) {
        return Ok(amount);
    }
    if let Some(price) = price {
        let minor = (price * Decimal::from(100)).round();
        if let Some(minor) = minor.to_i64() {
            if minor > 0 {
                return Ok(minor);
            }
        }
    }
    Err(AppError::InvalidArgument(
        "No payable amount for this event".to_string(),
    ))
}

/// Only well-formed http(s) URLs are forwarded as product images; the
/// gateway rejects anything else outright.
pub fn is_valid_image_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://"))
        && url.len() > "https://".len()
        && !url.contains(char::is_whitespace)
}

pub fn build_session_request(
    event: &Event,
    actor: Uuid,
    quantity: i64,
    currency: String,
    unit_amount: i64,
    app_origin: &str,
) -> SessionRequest {
    let product_image = event
        .image_url
        .as_deref()
        .filter(|url| is_valid_image_url(url))
        .map(str::to_string);
    SessionRequest {
        unit_amount,
        quantity,
        currency,
        product_name: event.title.clone(),
        product_image,
        event_id: event.id,
        user_id: actor,
        success_url: format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            app_origin
        ),
        cancel_url: format!("{}/checkout/cancel", app_origin),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutSessionInput {
    pub event_id: Uuid,
    pub quantity: i64,
    pub currency: Option<String>,
    pub override_unit_amount: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSessionCreated {
    pub url: String,
}

pub async fn create_checkout_session(
    state: &AppState,
    actor: &CurrentUser,
    input: CreateCheckoutSessionInput,
) -> Result<CheckoutSessionCreated, AppError> {
    if !quantity_in_range(input.quantity) {
        return Err(AppError::InvalidArgument(format!(
            "Quantity must be between 1 and {}",
            MAX_TICKETS_PER_ORDER
        )));
    }

    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(input.event_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", input.event_id)))?;

    if !event.is_purchasable() {
        return Err(AppError::FailedPrecondition(
            "Event is not open for ticket sales".to_string(),
        ));
    }

    if event.remaining_capacity() < input.quantity {
        return Err(AppError::FailedPrecondition(
            "Not enough tickets remaining".to_string(),
        ));
    }

    let unit_amount = resolve_unit_amount(event.price, input.override_unit_amount)?;

    let currency = input
        .currency
        .unwrap_or_else(|| event.currency.clone())
        .to_lowercase();
    let minimum = minimum_charge(&currency);
    if unit_amount < minimum {
        return Err(AppError::InvalidArgument(format!(
            "Amount is below the minimum charge of {} minor units for {}",
            minimum, currency
        )));
    }

    let request = build_session_request(
        &event,
        actor.id,
        input.quantity,
        currency,
        unit_amount,
        &state.config.app_origin,
    );
    let session = state.gateway.create_session(&request).await?;

    Ok(CheckoutSessionCreated { url: session.url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::tests::sample_event;

    #[test]
    fn minimum_charge_table_has_per_currency_floors() {
        assert_eq!(minimum_charge("usd"), 50);
        assert_eq!(minimum_charge("eur"), 50);
        assert_eq!(minimum_charge("gbp"), 30);
        assert_eq!(minimum_charge("jpy"), 50);
    }

    #[test]
    fn gbp_floor_accepts_30_and_rejects_20() {
        // 20 pence is under the floor, 30 pence is exactly on it.
        assert!(20 < minimum_charge("gbp"));
        assert!(30 >= minimum_charge("gbp"));
    }

    #[test]
    fn quantity_bounds_are_one_through_ten() {
        assert!(!quantity_in_range(0));
        assert!(quantity_in_range(1));
        assert!(quantity_in_range(10));
        assert!(!quantity_in_range(11));
        assert!(!quantity_in_range(-1));
    }

    #[test]
    fn positive_override_wins_over_the_stored_price() {
        let price = Some(Decimal::new(1250, 2));
        assert_eq!(resolve_unit_amount(price, Some(700)).unwrap(), 700);
    }

    #[test]
    fn stored_price_converts_to_rounded_minor_units() {
        assert_eq!(
            resolve_unit_amount(Some(Decimal::new(1250, 2)), None).unwrap(),
            1250
        );
        // Sub-cent precision rounds to the nearest minor unit.
        assert_eq!(
            resolve_unit_amount(Some(Decimal::new(12999, 3)), None).unwrap(),
            1300
        );
        // A non-positive override falls back to the stored price.
        assert_eq!(
            resolve_unit_amount(Some(Decimal::new(1250, 2)), Some(0)).unwrap(),
            1250
        );
    }

    #[test]
    fn no_price_and_no_override_is_an_invalid_argument() {
        let err = resolve_unit_amount(None, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let err = resolve_unit_amount(None, Some(0)).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn image_urls_must_be_http_or_https() {
        assert!(is_valid_image_url("https://img.example.com/a.jpg"));
        assert!(is_valid_image_url("http://img.example.com/a.jpg"));
        assert!(!is_valid_image_url("ftp://img.example.com/a.jpg"));
        assert!(!is_valid_image_url("data:image/png;base64,AAAA"));
        assert!(!is_valid_image_url("https://"));
        assert!(!is_valid_image_url("https://img.example.com/a b.jpg"));
    }

    #[test]
    fn session_request_embeds_metadata_and_redirects() {
        let mut event = sample_event();
        event.image_url = Some("https://img.example.com/a.jpg".to_string());
        let buyer = Uuid::new_v4();

        let request = build_session_request(
            &event,
            buyer,
            2,
            "usd".to_string(),
            1250,
            "https://tessera.events",
        );

        assert_eq!(request.event_id, event.id);
        assert_eq!(request.user_id, buyer);
        assert_eq!(request.unit_amount, 1250);
        assert_eq!(request.quantity, 2);
        assert_eq!(request.product_name, event.title);
        assert_eq!(
            request.product_image.as_deref(),
            Some("https://img.example.com/a.jpg")
        );
        assert_eq!(
            request.success_url,
            "https://tessera.events/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.cancel_url, "https://tessera.events/checkout/cancel");
    }

    #[test]
    fn invalid_image_urls_are_dropped_from_the_request() {
        let mut event = sample_event();
        event.image_url = Some("not a url".to_string());
        let request = build_session_request(
            &event,
            Uuid::new_v4(),
            1,
            "usd".to_string(),
            1250,
            "https://tessera.events",
        );
        assert_eq!(request.product_image, None);
    }
}
