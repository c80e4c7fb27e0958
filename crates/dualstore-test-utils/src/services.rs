//! In-memory entity services standing in for one store each

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dualstore_document::Document;
use dualstore_services::{
    departure_day, hotel_matches, project_hotel, Booking, BookingService, FlightPath, FlightPathService,
    HotelService, ServiceError, HOTEL_SEARCH_LIMIT,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Switches {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl Switches {
    fn enter(&self, store: &str) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(ServiceError::Unavailable(store.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Bookings held in memory
#[derive(Debug)]
pub struct InMemoryBookingService {
    store: &'static str,
    bookings: Mutex<Vec<Booking>>,
    switches: Switches,
}

impl InMemoryBookingService {
    pub fn new(store: &'static str) -> Self {
        Self {
            store,
            bookings: Mutex::new(Vec::new()),
            switches: Switches::default(),
        }
    }

    pub fn with_bookings(self, bookings: Vec<Booking>) -> Self {
        *self.bookings.lock() = bookings;
        self
    }

    /// Make every call fail with `Unavailable`
    pub fn set_failing(&self, failing: bool) {
        self.switches.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.switches.calls.load(Ordering::SeqCst)
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().clone()
    }
}

#[async_trait]
impl BookingService for InMemoryBookingService {
    async fn find_bookings_by_user(&self, username: &str) -> Result<Vec<Booking>, ServiceError> {
        self.switches.enter(self.store)?;
        Ok(self
            .bookings
            .lock()
            .iter()
            .filter(|b| b.username == username)
            .cloned()
            .collect())
    }

    async fn create_booking(&self, username: &str, booking: Booking) -> Result<Booking, ServiceError> {
        self.switches.enter(self.store)?;
        let booking = booking.ensure_identity(username, Utc::now());
        self.bookings.lock().push(booking.clone());
        Ok(booking)
    }
}

/// Flight schedule held in memory
#[derive(Debug)]
pub struct InMemoryFlightPathService {
    store: &'static str,
    routes: Vec<FlightPath>,
    switches: Switches,
}

impl InMemoryFlightPathService {
    pub fn new(store: &'static str, routes: Vec<FlightPath>) -> Self {
        Self {
            store,
            routes,
            switches: Switches::default(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.switches.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.switches.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightPathService for InMemoryFlightPathService {
    async fn find_flights(&self, from: &str, to: &str, leave: NaiveDate) -> Result<Vec<FlightPath>, ServiceError> {
        self.switches.enter(self.store)?;
        let day = departure_day(leave);
        Ok(self
            .routes
            .iter()
            .filter(|r| r.sourceairport == from && r.destinationairport == to && r.day == day)
            .cloned()
            .collect())
    }
}

/// Hotels held in memory
#[derive(Debug)]
pub struct InMemoryHotelService {
    store: &'static str,
    hotels: Vec<Document>,
    switches: Switches,
}

impl InMemoryHotelService {
    pub fn new(store: &'static str, hotels: Vec<Document>) -> Self {
        Self {
            store,
            hotels,
            switches: Switches::default(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.switches.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.switches.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HotelService for InMemoryHotelService {
    async fn find_hotels(&self, location: &str, description: &str) -> Result<Vec<Document>, ServiceError> {
        self.switches.enter(self.store)?;
        Ok(self
            .hotels
            .iter()
            .filter(|h| hotel_matches(h, location, description))
            .take(HOTEL_SEARCH_LIMIT)
            .map(project_hotel)
            .collect())
    }
}
