//! Mock booking client for testing without site access.
//!
//! Serves canned stations, trains, coaches and seats through the
//! [`BookingApi`] interface, with injectable failures for the outcomes
//! the scanner must handle: sold-out coaches, seats taken under our
//! nose, and outright request rejections.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Coach, CoachType, Station, Train};

use super::BookingApi;
use super::error::{ClientError, ResponseInfo};

/// Outcome of every booking attempt against the mock.
#[derive(Debug, Clone)]
pub enum BookingOutcome {
    /// `cart/add/` succeeds and issues this session id.
    Confirmed(String),
    /// The site reports the seat as already taken.
    SeatTaken,
}

/// Failure injected into the train listing.
#[derive(Debug, Clone, Copy)]
pub enum ListingFailure {
    /// The site rejects the request with HTTP 400.
    BadRequest,
    /// The site answers 2xx with its body-level error flag set.
    Business,
}

/// In-memory [`BookingApi`] implementation.
#[derive(Debug, Clone)]
pub struct MockBookingClient {
    stations: Vec<Station>,
    trains: Vec<Train>,
    /// Coaches keyed by coach-type letter.
    coaches: HashMap<String, Vec<Coach>>,
    /// Seat labels keyed by coach number.
    seats: HashMap<u32, BTreeSet<String>>,
    /// Coach numbers whose seat listing reports sold out.
    sold_out: HashSet<u32>,
    booking: BookingOutcome,
    listing_failure: Option<ListingFailure>,
}

impl Default for MockBookingClient {
    fn default() -> Self {
        Self {
            stations: Vec::new(),
            trains: Vec::new(),
            coaches: HashMap::new(),
            seats: HashMap::new(),
            sold_out: HashSet::new(),
            booking: BookingOutcome::SeatTaken,
            listing_failure: None,
        }
    }
}

impl MockBookingClient {
    /// An empty mock: no stations, no trains, every booking attempt
    /// reports the seat as taken.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a station to the search index.
    pub fn with_station(mut self, station: Station) -> Self {
        self.stations.push(station);
        self
    }

    /// Add a train to every listing response.
    pub fn with_train(mut self, train: Train) -> Self {
        self.trains.push(train);
        self
    }

    /// Serve these coaches for a coach-type letter.
    pub fn with_coaches(mut self, letter: impl Into<String>, coaches: Vec<Coach>) -> Self {
        self.coaches.insert(letter.into(), coaches);
        self
    }

    /// Serve these seat labels for a coach number.
    pub fn with_seats(mut self, coach_number: u32, labels: &[&str]) -> Self {
        self.seats.insert(
            coach_number,
            labels.iter().map(|label| label.to_string()).collect(),
        );
        self
    }

    /// Make the seat listing for a coach fail with a business error.
    pub fn with_sold_out_coach(mut self, coach_number: u32) -> Self {
        self.sold_out.insert(coach_number);
        self
    }

    /// Make every booking attempt succeed with this session id.
    pub fn with_booking_confirmed(mut self, session_id: impl Into<String>) -> Self {
        self.booking = BookingOutcome::Confirmed(session_id.into());
        self
    }

    /// Inject a failure into the train listing.
    pub fn with_listing_failure(mut self, failure: ListingFailure) -> Self {
        self.listing_failure = Some(failure);
        self
    }
}

fn business_error() -> ClientError {
    ClientError::Business(ResponseInfo {
        status: 200,
        request: None,
        body: r#"{"error":true,"value":"Place is occupied"}"#.to_string(),
        json: serde_json::from_str(r#"{"error":true,"value":"Place is occupied"}"#).ok(),
    })
}

fn bad_request_error() -> ClientError {
    ClientError::BadRequest(ResponseInfo {
        status: 400,
        request: None,
        body: "Bad Request".to_string(),
        json: None,
    })
}

#[async_trait]
impl BookingApi for MockBookingClient {
    async fn search_stations(&self, name: &str) -> Result<Vec<Station>, ClientError> {
        Ok(self
            .stations
            .iter()
            .filter(|station| station.title.to_lowercase().contains(&name.to_lowercase()))
            .cloned()
            .collect())
    }

    async fn list_trains(
        &self,
        _date: NaiveDate,
        _source: &Station,
        _destination: &Station,
    ) -> Result<Vec<Train>, ClientError> {
        match self.listing_failure {
            Some(ListingFailure::BadRequest) => Err(bad_request_error()),
            Some(ListingFailure::Business) => Err(business_error()),
            None => Ok(self.trains.clone()),
        }
    }

    async fn list_coaches(
        &self,
        _train: &Train,
        coach_type: &CoachType,
    ) -> Result<Vec<Coach>, ClientError> {
        Ok(self
            .coaches
            .get(&coach_type.letter)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_seats(
        &self,
        _train: &Train,
        coach: &Coach,
    ) -> Result<BTreeSet<String>, ClientError> {
        if self.sold_out.contains(&coach.number) {
            return Err(business_error());
        }
        Ok(self.seats.get(&coach.number).cloned().unwrap_or_default())
    }

    async fn book_seat(
        &self,
        _train: &Train,
        _coach: &Coach,
        _seat: &str,
        _first_name: &str,
        _last_name: &str,
    ) -> Result<String, ClientError> {
        match &self.booking {
            BookingOutcome::Confirmed(session_id) => Ok(session_id.clone()),
            BookingOutcome::SeatTaken => Err(business_error()),
        }
    }

    fn fresh_session(&self) -> Result<Box<dyn BookingApi>, ClientError> {
        Ok(Box::new(self.clone()))
    }
}
