//! Dualstore Services
//!
//! Travel entity contracts and their shadow implementations. Each
//! `Shadow*Service` implements the same trait as the store-specific services
//! it wraps, routing every call through one
//! [`ShadowDispatcher`](dualstore_routing::ShadowDispatcher).
//!
//! # Example
//!
//! ```rust,ignore
//! use dualstore_routing::{config_channel, FeatureConfig, ShadowDispatcher, ShadowWriterPool};
//! use dualstore_services::{BookingService, RoutingContext, ShadowBookingService};
//!
//! # async fn example(legacy: Arc<dyn BookingService>, target: Arc<dyn BookingService>) {
//! let (_tx, rx) = config_channel(FeatureConfig::new());
//! let pool = Arc::new(ShadowWriterPool::default());
//! let bookings = ShadowBookingService::new(
//!     ShadowDispatcher::new(legacy, target, pool),
//!     RoutingContext::new(rx),
//! );
//!
//! let mine = bookings.find_bookings_by_user("ann").await?;
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod booking;
pub mod context;
pub mod error;
pub mod flight;
pub mod hotel;

// Re-exports for convenience
pub use booking::{Booking, BookingService, ShadowBookingService};
pub use context::RoutingContext;
pub use error::ServiceError;
pub use flight::{departure_day, FlightPath, FlightPathService, ShadowFlightPathService};
pub use hotel::{hotel_matches, is_wildcard, project_hotel, HotelService, ShadowHotelService, HOTEL_SEARCH_LIMIT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
