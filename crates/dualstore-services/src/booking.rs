//! Bookings
//!
//! A booking gets its identifier and booking timestamp before it is routed,
//! so a shadow write stores the same record in both stores.

use crate::context::RoutingContext;
use crate::error::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dualstore_routing::{Cardinality, ShadowDispatcher};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Prefix of generated booking identifiers
pub const BOOKING_ID_PREFIX: &str = "booking::";

/// Timestamp format of `bookedon`
pub const BOOKED_ON_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A flight booking
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Booking {
    /// `booking::<uuid>` once stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owner
    #[serde(default)]
    pub username: String,
    /// Flight number
    pub flight: String,
    /// Price as quoted
    pub price: String,
    /// Travel date
    pub date: String,
    /// Origin airport code
    pub sourceairport: String,
    /// Destination airport code
    pub destinationairport: String,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookedon: Option<String>,
    /// Document type tag
    #[serde(rename = "type", default = "booking_type")]
    pub kind: String,
}

fn booking_type() -> String {
    "booking".to_string()
}

impl Booking {
    /// Assign owner, missing identifier and missing timestamp
    #[must_use]
    pub fn ensure_identity(mut self, username: &str, now: DateTime<Utc>) -> Self {
        self.username = username.to_string();
        if self.id.as_deref().map_or(true, str::is_empty) {
            self.id = Some(format!("{BOOKING_ID_PREFIX}{}", Uuid::new_v4()));
        }
        if self.bookedon.as_deref().map_or(true, str::is_empty) {
            self.bookedon = Some(now.format(BOOKED_ON_FORMAT).to_string());
        }
        if self.kind.is_empty() {
            self.kind = booking_type();
        }
        self
    }
}

impl Cardinality for Booking {}

/// Booking operations each store implements
#[async_trait]
pub trait BookingService: Send + Sync {
    /// Bookings owned by a user
    async fn find_bookings_by_user(&self, username: &str) -> Result<Vec<Booking>, ServiceError>;

    /// Store a booking for a user
    async fn create_booking(&self, username: &str, booking: Booking) -> Result<Booking, ServiceError>;
}

/// Booking service routed across both stores
#[derive(Debug)]
pub struct ShadowBookingService {
    dispatcher: ShadowDispatcher<dyn BookingService>,
    context: RoutingContext,
}

impl ShadowBookingService {
    /// Create shadow service
    #[must_use]
    pub fn new(dispatcher: ShadowDispatcher<dyn BookingService>, context: RoutingContext) -> Self {
        Self { dispatcher, context }
    }

    /// Underlying dispatcher
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &ShadowDispatcher<dyn BookingService> {
        &self.dispatcher
    }
}

#[async_trait]
impl BookingService for ShadowBookingService {
    async fn find_bookings_by_user(&self, username: &str) -> Result<Vec<Booking>, ServiceError> {
        let config = self.context.snapshot();
        self.dispatcher
            .read("findBookingsByUser", &config, self.context.draws(), |service| async move {
                service.find_bookings_by_user(username).await
            })
            .await
    }

    async fn create_booking(&self, username: &str, booking: Booking) -> Result<Booking, ServiceError> {
        if username.is_empty() {
            return Err(ServiceError::invalid("username is required"));
        }
        let config = self.context.snapshot();
        let booking = booking.ensure_identity(username, Utc::now());
        debug!(username, id = ?booking.id, "creating booking");

        self.dispatcher
            .write(
                "createBooking",
                &config,
                (username.to_string(), booking),
                |service, (username, booking)| async move { service.create_booking(&username, booking).await },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ensure_identity_fills_missing_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let booking = Booking::default().ensure_identity("ann", now);

        assert_eq!(booking.username, "ann");
        assert!(booking.id.as_deref().unwrap().starts_with(BOOKING_ID_PREFIX));
        assert_eq!(booking.bookedon.as_deref(), Some("2024-05-01T12:30:00.000Z"));
        assert_eq!(booking.kind, "booking");
    }

    #[test]
    fn ensure_identity_keeps_existing_fields() {
        let now = Utc::now();
        let booking = Booking {
            id: Some("booking::fixed".into()),
            bookedon: Some("2020-01-01T00:00:00.000Z".into()),
            username: "someone-else".into(),
            ..Booking::default()
        }
        .ensure_identity("ann", now);

        assert_eq!(booking.id.as_deref(), Some("booking::fixed"));
        assert_eq!(booking.bookedon.as_deref(), Some("2020-01-01T00:00:00.000Z"));
        assert_eq!(booking.username, "ann");
    }

    #[test]
    fn booking_json_uses_type_tag() {
        let booking = Booking {
            flight: "AF198".into(),
            ..Booking::default()
        };
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["flight"], "AF198");
        assert!(json.get("id").is_none());

        let parsed: Booking = serde_json::from_value(serde_json::json!({
            "flight": "AF198", "price": "120.00", "date": "05/01/2024",
            "sourceairport": "SFO", "destinationairport": "CDG"
        }))
        .unwrap();
        assert_eq!(parsed.kind, "booking");
    }
}
