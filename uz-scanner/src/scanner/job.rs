//! Scan job records.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::NaiveDate;
use tokio::sync::Mutex as AsyncMutex;

use crate::domain::Station;

/// Error from scan registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// The id was never issued, or its job already resolved.
    #[error("unknown scan id: {0}")]
    UnknownScanId(String),
}

/// The immutable parameters of a scan, fixed at job creation.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Opaque reference handed back to the notifier on success.
    pub callback_ref: String,
    /// Passenger first name for the booking form.
    pub first_name: String,
    /// Passenger last name for the booking form.
    pub last_name: String,
    /// Travel date.
    pub date: NaiveDate,
    /// Boarding station.
    pub source: Station,
    /// Alighting station.
    pub destination: Station,
    /// Train number to watch, e.g. `741К`.
    pub train_number: String,
    /// Restrict the scan to one coach-type letter, if set.
    pub coach_type: Option<String>,
}

/// One active scan with its mutable attempt state.
///
/// The guard is held for the duration of a booking attempt; a cycle
/// that finds it taken skips the job, so attempts never queue up behind
/// a slow one.
pub struct ScanJob {
    pub(crate) request: ScanRequest,
    attempts: AtomicU32,
    last_error: Mutex<Option<String>>,
    pub(crate) guard: AsyncMutex<()>,
}

impl ScanJob {
    pub(crate) fn new(request: ScanRequest) -> Self {
        Self {
            request,
            attempts: AtomicU32::new(0),
            last_error: Mutex::new(None),
            guard: AsyncMutex::new(()),
        }
    }

    /// Count one more attempt; returns the new total.
    pub(crate) fn record_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Attempts performed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The most recent human-readable failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    pub(crate) fn set_error(&self, message: String) {
        tracing::debug!(error = %message, "scan attempt came up empty");
        *self.last_error.lock().unwrap() = Some(message);
    }
}
