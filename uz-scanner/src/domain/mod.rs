//! Domain types for the UZ booking pipeline.
//!
//! These are the validated records exchanged between the booking client
//! and the scanner: stations, trains, coach types, coaches and the
//! site's two-part timestamps. Wire mapping lives in the booking layer;
//! these types carry no serde themselves.

mod coach;
mod station;
mod time;
mod train;

pub use coach::{Coach, CoachType};
pub use station::Station;
pub use time::{DATE_FMT, UzTimestamp};
pub use train::Train;
