use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum PriceType {
    Free,
    Fixed,
    PayWhatYouWant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub venue: Option<String>,
    pub category: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub organizer_name: Option<String>,
    pub organizer_email: Option<String>,
    pub capacity: i32,
    pub tickets_sold: i32,
    pub price_type: PriceType,
    pub price: Option<Decimal>,
    pub currency: String,
    pub publish_status: PublishStatus,
    pub moderation_status: Option<ModerationStatus>,
    pub moderation_reason: Option<String>,
    pub approved_hash: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Tickets still available for sale, floored at zero. `tickets_sold`
    /// can exceed `capacity` after an over-capacity payment was recorded.
    pub fn remaining_capacity(&self) -> i64 {
        (i64::from(self.capacity) - i64::from(self.tickets_sold)).max(0)
    }

    pub fn is_purchasable(&self) -> bool {
        self.publish_status == PublishStatus::Published
            && self.moderation_status == Some(ModerationStatus::Approved)
    }

    /// Fingerprint of the fields staff review. The stored `approved_hash`
    /// is compared against a fresh fingerprint on publish to decide whether
    /// an event needs another review pass. The field list is versioned:
    /// adding or removing a field invalidates every stored hash and must be
    /// handled as a data migration.
    pub fn content_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"v1");
        for field in [
            Some(self.title.as_str()),
            self.description.as_deref(),
            self.body.as_deref(),
            self.image_url.as_deref(),
            self.venue.as_deref(),
            self.category.as_deref(),
            self.organizer_name.as_deref(),
            self.organizer_email.as_deref(),
        ] {
            // Length-prefixed so adjacent fields can never collide by
            // shifting bytes between them.
            match field {
                Some(value) => {
                    hasher.update((value.len() as u64).to_be_bytes());
                    hasher.update(value.as_bytes());
                }
                None => hasher.update(u64::MAX.to_be_bytes()),
            }
        }
        for instant in [self.starts_at, self.ends_at] {
            match instant {
                Some(ts) => hasher.update(ts.timestamp_millis().to_be_bytes()),
                None => hasher.update(i64::MIN.to_be_bytes()),
            }
        }
        hasher.update(self.capacity.to_be_bytes());
        hasher.update(match self.price_type {
            PriceType::Free => [0u8],
            PriceType::Fixed => [1u8],
            PriceType::PayWhatYouWant => [2u8],
        });
        match self.price {
            Some(price) => {
                let normalized = price.normalize().to_string();
                hasher.update((normalized.len() as u64).to_be_bytes());
                hasher.update(normalized.as_bytes());
            }
            None => hasher.update(u64::MAX.to_be_bytes()),
        }
        hasher.update((self.currency.len() as u64).to_be_bytes());
        hasher.update(self.currency.as_bytes());

        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_event() -> Event {
        Event {
            id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            title: "Summer Block Party".to_string(),
            description: Some("Music and food".to_string()),
            body: Some("<p>All afternoon</p>".to_string()),
            image_url: Some("https://img.example.com/block-party.jpg".to_string()),
            venue: Some("Riverside Park".to_string()),
            category: Some("music".to_string()),
            starts_at: Some("2026-06-20T18:00:00Z".parse().unwrap()),
            ends_at: Some("2026-06-20T23:00:00Z".parse().unwrap()),
            organizer_name: Some("Riverside Collective".to_string()),
            organizer_email: Some("hello@riverside.example".to_string()),
            capacity: 100,
            tickets_sold: 0,
            price_type: PriceType::Fixed,
            price: Some(Decimal::new(1250, 2)),
            currency: "usd".to_string(),
            publish_status: PublishStatus::Draft,
            moderation_status: None,
            moderation_reason: None,
            approved_hash: None,
            approved_at: None,
            submitted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn fingerprint_is_stable_for_identical_content() {
        let event = sample_event();
        assert_eq!(event.content_fingerprint(), event.content_fingerprint());

        let mut copy = event.clone();
        // Non-moderated fields must not affect the fingerprint.
        copy.tickets_sold = 42;
        copy.publish_status = PublishStatus::Published;
        copy.moderation_status = Some(ModerationStatus::Rejected);
        assert_eq!(event.content_fingerprint(), copy.content_fingerprint());
    }

    #[test]
    fn fingerprint_changes_when_any_reviewed_field_changes() {
        let base = sample_event();
        let base_hash = base.content_fingerprint();

        let mut changed = base.clone();
        changed.title = "Autumn Block Party".to_string();
        assert_ne!(base_hash, changed.content_fingerprint());

        let mut changed = base.clone();
        changed.capacity = 101;
        assert_ne!(base_hash, changed.content_fingerprint());

        let mut changed = base.clone();
        changed.price = Some(Decimal::new(1300, 2));
        assert_ne!(base_hash, changed.content_fingerprint());

        let mut changed = base.clone();
        changed.description = None;
        assert_ne!(base_hash, changed.content_fingerprint());
    }

    #[test]
    fn adjacent_optional_fields_do_not_collide() {
        let mut a = sample_event();
        a.description = Some("abc".to_string());
        a.body = Some("def".to_string());

        let mut b = sample_event();
        b.description = Some("abcd".to_string());
        b.body = Some("ef".to_string());

        assert_ne!(a.content_fingerprint(), b.content_fingerprint());
    }

    #[test]
    fn remaining_capacity_floors_at_zero() {
        let mut event = sample_event();
        event.capacity = 10;
        event.tickets_sold = 12;
        assert_eq!(event.remaining_capacity(), 0);

        event.tickets_sold = 4;
        assert_eq!(event.remaining_capacity(), 6);
    }
}
