//! Client for the UZ online booking site.
//!
//! The site has no public API, so the client behaves like the browser
//! front-end it was reverse-engineered from:
//!
//! - every call is a form-encoded POST carrying a rotating browser
//!   fingerprint, a `GV-Referer` and the current `GV-Token`;
//! - the token is short-lived and only obtainable by decoding an
//!   obfuscated script on the landing page (see [`crate::jjdecode`]);
//! - a 2xx response may still be a failure: the body-level `error` flag
//!   signals business conditions like "seat already taken".
//!
//! [`UzClient`] is the production implementation; [`mock`] provides an
//! in-memory one for tests and development.

mod client;
mod convert;
mod error;
pub mod mock;
mod token;
mod types;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Coach, CoachType, Station, Train};

pub use client::{UzClient, UzConfig};
pub use error::{ClientError, ResponseInfo};
pub use token::{TOKEN_MAX_AGE, TokenCell, extract_token, random_user_agent};
pub use types::{
    CoachDto, CoachTypeDto, CoachesDto, SeatsDto, StationDto, StationPointDto, TrainDto,
    ValueResponse,
};

/// The booking operations the scanner drives.
///
/// Implemented by [`UzClient`] against the live site and by
/// [`mock::MockBookingClient`] in memory.
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// Stations whose title matches `name`.
    async fn search_stations(&self, name: &str) -> Result<Vec<Station>, ClientError>;

    /// First station matching `name`, if any.
    async fn fetch_first_station(&self, name: &str) -> Result<Option<Station>, ClientError> {
        Ok(self.search_stations(name).await?.into_iter().next())
    }

    /// Trains running between two stations on a date.
    async fn list_trains(
        &self,
        date: NaiveDate,
        source: &Station,
        destination: &Station,
    ) -> Result<Vec<Train>, ClientError>;

    /// The train with the given number on that date and route, if it runs.
    async fn fetch_train(
        &self,
        date: NaiveDate,
        source: &Station,
        destination: &Station,
        number: &str,
    ) -> Result<Option<Train>, ClientError> {
        let trains = self.list_trains(date, source, destination).await?;
        Ok(trains.into_iter().find(|train| train.number == number))
    }

    /// Coaches of one class on a train.
    async fn list_coaches(
        &self,
        train: &Train,
        coach_type: &CoachType,
    ) -> Result<Vec<Coach>, ClientError>;

    /// Distinct free seat labels in a coach.
    async fn list_seats(&self, train: &Train, coach: &Coach)
    -> Result<BTreeSet<String>, ClientError>;

    /// Put one seat into the cart; returns the provider session id.
    async fn book_seat(
        &self,
        train: &Train,
        coach: &Coach,
        seat: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<String, ClientError>;

    /// A distinct, independently scoped session against the same site.
    ///
    /// Self-contained multi-step flows (listing and booking under one
    /// identity) must run on their own session so cookie and token state
    /// never leaks across unrelated flows.
    fn fresh_session(&self) -> Result<Box<dyn BookingApi>, ClientError>;
}
