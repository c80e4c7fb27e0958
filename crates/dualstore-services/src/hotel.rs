//! Hotel search
//!
//! Results are generic documents projected to `name`, `description` and
//! `address`. Ranking is left to each store's native text search; the shared
//! contract is only which hotels qualify:
//! - `location` matches `country`, `city`, `state` or `address`
//! - `description` matches `description` or `name`
//! - an empty term or `*` matches everything
//!
//! At most [`HOTEL_SEARCH_LIMIT`] hotels are returned.

use crate::context::RoutingContext;
use crate::error::ServiceError;
use async_trait::async_trait;
use dualstore_document::Document;
use dualstore_routing::ShadowDispatcher;

/// Maximum hotels per search
pub const HOTEL_SEARCH_LIMIT: usize = 100;

/// Fields a location term is matched against
pub const LOCATION_FIELDS: [&str; 4] = ["country", "city", "state", "address"];

/// Fields a description term is matched against
pub const DESCRIPTION_FIELDS: [&str; 2] = ["description", "name"];

/// Fields kept in search results
pub const RESULT_FIELDS: [&str; 3] = ["name", "description", "address"];

/// Term that matches every hotel
#[inline]
#[must_use]
pub fn is_wildcard(term: &str) -> bool {
    let term = term.trim();
    term.is_empty() || term == "*"
}

fn field_contains(hotel: &Document, fields: &[&str], term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    fields.iter().any(|field| {
        hotel
            .get_str(field)
            .is_some_and(|value| value.to_lowercase().contains(&needle))
    })
}

/// Whether a hotel qualifies for a search
#[must_use]
pub fn hotel_matches(hotel: &Document, location: &str, description: &str) -> bool {
    (is_wildcard(location) || field_contains(hotel, &LOCATION_FIELDS, location))
        && (is_wildcard(description) || field_contains(hotel, &DESCRIPTION_FIELDS, description))
}

/// Project a hotel to the result fields
#[must_use]
pub fn project_hotel(hotel: &Document) -> Document {
    RESULT_FIELDS
        .iter()
        .filter_map(|field| hotel.get(field).map(|value| ((*field).to_string(), value.clone())))
        .collect()
}

/// Hotel search each store implements
#[async_trait]
pub trait HotelService: Send + Sync {
    /// Hotels matching a location and a description
    async fn find_hotels(&self, location: &str, description: &str) -> Result<Vec<Document>, ServiceError>;

    /// Hotels matching a description anywhere
    async fn find_hotels_by_description(&self, description: &str) -> Result<Vec<Document>, ServiceError> {
        self.find_hotels("*", description).await
    }

    /// Every hotel, up to the search limit
    async fn find_all_hotels(&self) -> Result<Vec<Document>, ServiceError> {
        self.find_hotels("*", "*").await
    }
}

/// Hotel search routed across both stores
#[derive(Debug)]
pub struct ShadowHotelService {
    dispatcher: ShadowDispatcher<dyn HotelService>,
    context: RoutingContext,
}

impl ShadowHotelService {
    /// Create shadow service
    #[must_use]
    pub fn new(dispatcher: ShadowDispatcher<dyn HotelService>, context: RoutingContext) -> Self {
        Self { dispatcher, context }
    }

    /// Underlying dispatcher
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &ShadowDispatcher<dyn HotelService> {
        &self.dispatcher
    }
}

#[async_trait]
impl HotelService for ShadowHotelService {
    async fn find_hotels(&self, location: &str, description: &str) -> Result<Vec<Document>, ServiceError> {
        let config = self.context.snapshot();
        self.dispatcher
            .read("findHotels", &config, self.context.draws(), |service| async move {
                service.find_hotels(location, description).await
            })
            .await
    }

    async fn find_hotels_by_description(&self, description: &str) -> Result<Vec<Document>, ServiceError> {
        let config = self.context.snapshot();
        self.dispatcher
            .read("findHotelsByDescription", &config, self.context.draws(), |service| async move {
                service.find_hotels_by_description(description).await
            })
            .await
    }

    async fn find_all_hotels(&self) -> Result<Vec<Document>, ServiceError> {
        let config = self.context.snapshot();
        self.dispatcher
            .read("findAllHotels", &config, self.context.draws(), |service| async move {
                service.find_all_hotels().await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualstore_document::Value;

    fn hotel() -> Document {
        let mut doc = Document::new();
        doc.insert("name", "Medway Youth Hostel");
        doc.insert("description", "40 bed summer hostel about 3 miles from Gillingham");
        doc.insert("city", "Medway");
        doc.insert("country", "United Kingdom");
        doc.insert("address", "Capstone Road, ME7 3JE");
        doc.insert("vacancy", true);
        doc
    }

    #[test]
    fn wildcards_match_everything() {
        assert!(is_wildcard(""));
        assert!(is_wildcard(" * "));
        assert!(hotel_matches(&hotel(), "*", ""));
    }

    #[test]
    fn terms_match_case_insensitively() {
        assert!(hotel_matches(&hotel(), "united kingdom", "HOSTEL"));
        assert!(hotel_matches(&hotel(), "Capstone", "*"));
        assert!(!hotel_matches(&hotel(), "France", "*"));
        assert!(!hotel_matches(&hotel(), "*", "spa"));
    }

    #[test]
    fn projection_keeps_result_fields() {
        let projected = project_hotel(&hotel());
        assert_eq!(projected.len(), 3);
        assert_eq!(projected.get("vacancy"), None::<&Value>);
        assert_eq!(projected.get_str("name"), Some("Medway Youth Hostel"));
    }
}
