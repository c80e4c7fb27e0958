//! Flight paths

use crate::context::RoutingContext;
use crate::error::ServiceError;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use dualstore_routing::{Cardinality, ShadowDispatcher};
use serde::{Deserialize, Serialize};

/// A scheduled flight between two airports
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlightPath {
    /// Route identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Airline name
    pub name: String,
    /// Airline identifier
    pub airlineid: String,
    /// Flight number
    pub flight: String,
    /// Day of week, 0 = Sunday
    pub day: u32,
    /// Departure time (UTC)
    pub utc: String,
    /// Origin airport code
    pub sourceairport: String,
    /// Destination airport code
    pub destinationairport: String,
    /// Aircraft type codes
    pub equipment: String,
}

impl Cardinality for FlightPath {}

/// Schedule day of a departure date, 0 = Sunday
#[inline]
#[must_use]
pub fn departure_day(leave: NaiveDate) -> u32 {
    leave.weekday().num_days_from_sunday()
}

/// Flight search each store implements
#[async_trait]
pub trait FlightPathService: Send + Sync {
    /// Flights from `from` to `to` operating on the weekday of `leave`
    async fn find_flights(&self, from: &str, to: &str, leave: NaiveDate) -> Result<Vec<FlightPath>, ServiceError>;
}

/// Flight search routed across both stores
#[derive(Debug)]
pub struct ShadowFlightPathService {
    dispatcher: ShadowDispatcher<dyn FlightPathService>,
    context: RoutingContext,
}

impl ShadowFlightPathService {
    /// Create shadow service
    #[must_use]
    pub fn new(dispatcher: ShadowDispatcher<dyn FlightPathService>, context: RoutingContext) -> Self {
        Self { dispatcher, context }
    }

    /// Underlying dispatcher
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &ShadowDispatcher<dyn FlightPathService> {
        &self.dispatcher
    }
}

#[async_trait]
impl FlightPathService for ShadowFlightPathService {
    async fn find_flights(&self, from: &str, to: &str, leave: NaiveDate) -> Result<Vec<FlightPath>, ServiceError> {
        if from.is_empty() || to.is_empty() {
            return Err(ServiceError::invalid("origin and destination are required"));
        }
        let config = self.context.snapshot();
        self.dispatcher
            .read("findFlights", &config, self.context.draws(), |service| async move {
                service.find_flights(from, to, leave).await
            })
            .await
    }
}
