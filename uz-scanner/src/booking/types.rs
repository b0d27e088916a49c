//! Wire DTOs for the UZ booking endpoints.
//!
//! These records map one-to-one onto the JSON the site returns. They
//! derive both `Serialize` and `Deserialize` because the round-trip
//! through the domain types must reproduce the original record exactly
//! (these are also the objects observed by callers). Station ids are
//! integers throughout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Generic `{value: ...}` envelope used by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueResponse<T> {
    pub value: T,
}

/// A station from `purchase/station/{name}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDto {
    pub station_id: i64,
    pub title: String,
}

/// One end of a train journey: station plus the two-part timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationPointDto {
    /// Seconds since the Unix epoch.
    pub date: i64,
    /// The site's textual rendering of `date`, carried verbatim.
    pub src_date: String,
    pub station: String,
    pub station_id: i64,
}

/// A coach class entry inside a train record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachTypeDto {
    pub letter: String,
    pub places: u32,
    pub title: String,
}

/// A train from `purchase/search/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainDto {
    pub category: u32,
    pub model: u32,
    pub num: String,
    pub travel_time: String,
    pub types: Vec<CoachTypeDto>,
    #[serde(rename = "from")]
    pub from_point: StationPointDto,
    #[serde(rename = "till")]
    pub till_point: StationPointDto,
}

/// A coach from `purchase/coaches/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachDto {
    pub allow_bonus: bool,
    pub coach_class: String,
    pub coach_type_id: u32,
    #[serde(rename = "hasBedding")]
    pub has_bedding: bool,
    pub num: u32,
    pub places_cnt: u32,
    /// Price per fare class, in kopecks.
    pub prices: BTreeMap<String, u64>,
    pub reserve_price: u64,
    pub services: Vec<String>,
}

/// Envelope payload of `purchase/coaches/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoachesDto {
    pub coaches: Vec<CoachDto>,
}

/// Envelope payload of `purchase/coach/` (seat listing).
///
/// Seat labels are grouped by fare class; the same label may appear in
/// several groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatsDto {
    pub css: String,
    pub places: BTreeMap<String, Vec<String>>,
}
