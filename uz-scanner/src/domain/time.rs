//! The site's two-part timestamps.

use std::fmt;

use chrono::{DateTime, Utc};

/// Date format used in train search payloads.
pub const DATE_FMT: &str = "%m.%d.%Y";

/// A departure or arrival time as the site reports it.
///
/// The site sends both an epoch and its own textual rendering of that
/// instant. The display string cannot be reconstructed from the epoch
/// (the site renders in a timezone it does not disclose), so the pair is
/// carried verbatim. Equality is by epoch only.
#[derive(Debug, Clone, Eq)]
pub struct UzTimestamp {
    /// Seconds since the Unix epoch.
    pub epoch: i64,
    /// The site's textual rendering, preserved verbatim.
    pub display: String,
}

impl UzTimestamp {
    /// Create a timestamp from an epoch and the site's rendering of it.
    pub fn new(epoch: i64, display: impl Into<String>) -> Self {
        Self {
            epoch,
            display: display.into(),
        }
    }

    /// The instant as a UTC datetime, if the epoch is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.epoch, 0)
    }
}

impl PartialEq for UzTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.epoch == other.epoch
    }
}

impl fmt::Display for UzTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
