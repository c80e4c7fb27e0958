//! Shadow Service Tests
//!
//! Entity services routed across two in-memory stores.

use chrono::{NaiveDate, Utc};
use dualstore_routing::{FeatureConfig, ReadMode, ShadowPercentage, WriteMode};
use dualstore_services::{
    BookingService, FlightPathService, HotelService, ServiceError, ShadowBookingService, ShadowFlightPathService,
    ShadowHotelService,
};
use dualstore_test_utils::{
    context, dispatcher, sample_booking, sample_hotels, sample_routes, InMemoryBookingService,
    InMemoryFlightPathService, InMemoryHotelService,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn bookings(
    config: FeatureConfig,
) -> (ShadowBookingService, Arc<InMemoryBookingService>, Arc<InMemoryBookingService>) {
    let legacy = Arc::new(InMemoryBookingService::new("legacy"));
    let target = Arc::new(InMemoryBookingService::new("target"));
    let (l, t): (Arc<dyn BookingService>, Arc<dyn BookingService>) = (legacy.clone(), target.clone());
    let service = ShadowBookingService::new(dispatcher(l, t), context(config, vec![0]));
    (service, legacy, target)
}

fn hotels(config: FeatureConfig, draws: Vec<u32>) -> (ShadowHotelService, Arc<InMemoryHotelService>, Arc<InMemoryHotelService>) {
    let legacy = Arc::new(InMemoryHotelService::new("legacy", sample_hotels()));
    let target = Arc::new(InMemoryHotelService::new("target", sample_hotels()[..2].to_vec()));
    let (l, t): (Arc<dyn HotelService>, Arc<dyn HotelService>) = (legacy.clone(), target.clone());
    let service = ShadowHotelService::new(dispatcher(l, t), context(config, draws));
    (service, legacy, target)
}

#[tokio::test]
async fn test_shadow_booking_lands_in_both_stores_with_one_id() {
    let config = FeatureConfig::new().with_writes(WriteMode::On, WriteMode::On);
    let (service, legacy, target) = bookings(config);

    let created = service.create_booking("ann", sample_booking("UA100")).await.unwrap();
    service.dispatcher().pool().wait_idle().await;

    let id = created.id.clone().unwrap();
    assert!(id.starts_with("booking::"));
    assert_eq!(legacy.bookings(), vec![created.clone()]);
    assert_eq!(target.bookings().len(), 1);
    assert_eq!(target.bookings()[0].id.as_deref(), Some(id.as_str()));
    assert_eq!(target.bookings()[0].bookedon, created.bookedon);
}

#[tokio::test]
async fn test_single_store_write_is_not_mirrored() {
    let config = FeatureConfig::new().with_writes(WriteMode::Off, WriteMode::On);
    let (service, legacy, target) = bookings(config);

    service.create_booking("ann", sample_booking("UA100")).await.unwrap();
    service.dispatcher().pool().wait_idle().await;

    assert_eq!(legacy.calls(), 0);
    assert_eq!(target.bookings().len(), 1);
    assert_eq!(service.dispatcher().pool().stats().submitted, 0);
}

#[tokio::test]
async fn test_failing_shadow_write_is_invisible() {
    let config = FeatureConfig::new().with_writes(WriteMode::On, WriteMode::On);
    let (service, legacy, target) = bookings(config);
    target.set_failing(true);

    let created = service.create_booking("ann", sample_booking("UA100")).await;
    service.dispatcher().pool().wait_idle().await;

    assert!(created.is_ok());
    assert_eq!(legacy.bookings().len(), 1);
    assert!(target.bookings().is_empty());
    assert_eq!(service.dispatcher().pool().stats().failed, 1);
}

#[tokio::test]
async fn test_empty_username_is_rejected_before_routing() {
    let (service, legacy, target) = bookings(FeatureConfig::new());

    let err = service.create_booking("", sample_booking("UA100")).await.unwrap_err();

    assert!(matches!(err, ServiceError::Invalid(_)));
    assert_eq!(legacy.calls() + target.calls(), 0);
}

#[tokio::test]
async fn test_booking_lookup_counts_mismatch() {
    let existing = sample_booking("UA100").ensure_identity("ann", Utc::now());
    let legacy = Arc::new(InMemoryBookingService::new("legacy").with_bookings(vec![existing]));
    let target = Arc::new(InMemoryBookingService::new("target"));
    let (l, t): (Arc<dyn BookingService>, Arc<dyn BookingService>) = (legacy.clone(), target.clone());
    let service = ShadowBookingService::new(
        dispatcher(l, t),
        context(FeatureConfig::new().with_validation(true), vec![0]),
    );

    let found = service.find_bookings_by_user("ann").await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(target.calls(), 1);
    let stats = service.dispatcher().validator().stats();
    assert_eq!(stats.mismatched, 1);
    assert_eq!(stats.passed, 0);
}

#[tokio::test]
async fn test_flight_search_uses_departure_weekday() {
    let legacy = Arc::new(InMemoryFlightPathService::new("legacy", sample_routes()));
    let target = Arc::new(InMemoryFlightPathService::new("target", sample_routes()));
    let (l, t): (Arc<dyn FlightPathService>, Arc<dyn FlightPathService>) = (legacy.clone(), target.clone());
    let service = ShadowFlightPathService::new(
        dispatcher(l, t),
        context(FeatureConfig::new().with_validation(true), vec![0]),
    );

    let sunday = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
    let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();

    let on_sunday = service.find_flights("SFO", "LAX", sunday).await.unwrap();
    let on_monday = service.find_flights("SFO", "LAX", monday).await.unwrap();

    let flights: Vec<_> = on_sunday.iter().map(|f| f.flight.as_str()).collect();
    assert_eq!(flights, vec!["UA100", "UA101"]);
    assert_eq!(on_monday.len(), 1);
    assert_eq!(service.dispatcher().validator().stats().passed, 2);
}

#[tokio::test]
async fn test_flight_search_requires_airports() {
    let legacy = Arc::new(InMemoryFlightPathService::new("legacy", sample_routes()));
    let target = Arc::new(InMemoryFlightPathService::new("target", sample_routes()));
    let (l, t): (Arc<dyn FlightPathService>, Arc<dyn FlightPathService>) = (legacy.clone(), target.clone());
    let service = ShadowFlightPathService::new(dispatcher(l, t), context(FeatureConfig::new(), vec![0]));

    let leave = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
    assert!(service.find_flights("", "LAX", leave).await.is_err());
    assert_eq!(legacy.calls(), 0);
}

#[tokio::test]
async fn test_hotel_search_follows_percentage_draws() {
    let config = FeatureConfig::new().with_shadow_percentage(ShadowPercentage::new(30).unwrap());
    // 10 is below the threshold, 75 is not
    let (service, legacy, target) = hotels(config, vec![10, 75]);

    let first = service.find_hotels("United Kingdom", "*").await.unwrap();
    let second = service.find_hotels("United Kingdom", "*").await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(target.calls(), 1);
    assert_eq!(legacy.calls(), 1);
}

#[tokio::test]
async fn test_explicit_read_mode_ignores_percentage() {
    let config = FeatureConfig::new()
        .with_read(ReadMode::Legacy)
        .with_shadow_percentage(ShadowPercentage::ALL);
    let (service, legacy, target) = hotels(config, vec![0]);

    let all = service.find_all_hotels().await.unwrap();

    assert_eq!(all.len(), 3);
    assert_eq!(legacy.calls(), 1);
    assert_eq!(target.calls(), 0);
    for hotel in &all {
        assert!(hotel.get("city").is_none());
        assert!(hotel.get_str("name").is_some());
    }
}

#[tokio::test]
async fn test_failing_validation_read_is_invisible() {
    let config = FeatureConfig::new().with_validation(true);
    let (service, legacy, target) = hotels(config, vec![0]);
    target.set_failing(true);

    let found = service.find_hotels_by_description("guesthouse").await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_str("name"), Some("The Balmoral Guesthouse"));
    assert_eq!(legacy.calls(), 1);
    assert_eq!(target.calls(), 1);
    assert_eq!(service.dispatcher().validator().stats().skipped, 1);
}
