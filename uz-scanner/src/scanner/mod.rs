//! Scan scheduler: retries the booking pipeline for a dynamic set of
//! watch jobs.
//!
//! One trigger loop fires one booking attempt per active job per cycle.
//! Attempts are dispatched in registry order but run concurrently; a
//! per-job guard keeps a slow attempt from stacking up behind itself,
//! and a cycle that finds the guard taken skips the job. Jobs stay active
//! through transient failures ("train not found yet", "no seats") and
//! leave the registry only on success or explicit abort.

mod job;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::booking::{BookingApi, ClientError};
use crate::domain::{CoachType, Train};
use crate::notify::Notifier;

pub use job::{ScanError, ScanJob, ScanRequest};

/// Configuration for the scanner.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Delay between trigger cycles.
    pub delay: Duration,
    /// Interval of the active-scan gauge emission.
    pub metric_interval: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(60),
            metric_interval: Duration::from_secs(5),
        }
    }
}

impl ScannerConfig {
    /// Set the delay between trigger cycles.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the gauge emission interval.
    pub fn with_metric_interval(mut self, interval: Duration) -> Self {
        self.metric_interval = interval;
        self
    }
}

/// The scan scheduler.
///
/// Owns the job registry and a shared [`BookingApi`]. Job lifecycle
/// (`add_job`/`status`/`abort`) is driven by an external front-end;
/// the trigger loop ([`run`](Scanner::run)) drives retries and calls
/// the [`Notifier`] once a seat is secured.
pub struct Scanner {
    client: Arc<dyn BookingApi>,
    notifier: Arc<dyn Notifier>,
    config: ScannerConfig,
    registry: Mutex<HashMap<String, Arc<ScanJob>>>,
    running: AtomicBool,
    wake: Notify,
}

impl Scanner {
    /// Create a scanner over a booking client and a notifier.
    pub fn new(
        client: Arc<dyn BookingApi>,
        notifier: Arc<dyn Notifier>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            client,
            notifier,
            config,
            registry: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    /// Register a new scan job and return its id.
    ///
    /// Attempts begin on the next trigger cycle, never synchronously.
    pub fn add_job(&self, request: ScanRequest) -> String {
        let scan_id = Uuid::new_v4().simple().to_string();
        tracing::debug!(
            %scan_id,
            train = %request.train_number,
            date = %request.date,
            "scan job added"
        );
        self.registry
            .lock()
            .unwrap()
            .insert(scan_id.clone(), Arc::new(ScanJob::new(request)));
        scan_id
    }

    /// Attempt count and most recent error for a job.
    pub fn status(&self, scan_id: &str) -> Result<(u32, Option<String>), ScanError> {
        let registry = self.registry.lock().unwrap();
        let job = registry
            .get(scan_id)
            .ok_or_else(|| ScanError::UnknownScanId(scan_id.to_string()))?;
        Ok((job.attempts(), job.last_error()))
    }

    /// Remove a job from the registry.
    pub fn abort(&self, scan_id: &str) -> Result<bool, ScanError> {
        match self.registry.lock().unwrap().remove(scan_id) {
            Some(_) => {
                tracing::debug!(scan_id, "scan job aborted");
                Ok(true)
            }
            None => Err(ScanError::UnknownScanId(scan_id.to_string())),
        }
    }

    /// Number of jobs currently in the registry.
    pub fn active_jobs(&self) -> usize {
        self.registry.lock().unwrap().len()
    }

    /// Stop the trigger loop and the gauge emission.
    ///
    /// Cooperative: the flag is observed at the top of each loop
    /// iteration; attempts already dispatched run to completion.
    pub fn stop(&self) {
        tracing::info!("stopping scanner");
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Run the trigger loop until [`stop`](Scanner::stop) is called.
    ///
    /// Returns only after every dispatched attempt has completed, so the
    /// caller can safely release the network session afterwards.
    pub async fn run(self: Arc<Self>) {
        tracing::info!("starting scanner");
        self.running.store(true, Ordering::SeqCst);

        let stats = tokio::spawn(self.clone().emit_stats());
        let mut attempts: JoinSet<()> = JoinSet::new();

        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            while attempts.try_join_next().is_some() {}

            let jobs: Vec<(String, Arc<ScanJob>)> = {
                let registry = self.registry.lock().unwrap();
                registry
                    .iter()
                    .map(|(id, job)| (id.clone(), job.clone()))
                    .collect()
            };
            for (scan_id, job) in jobs {
                let scanner = self.clone();
                attempts.spawn(async move {
                    if let Err(error) = scanner.scan(&scan_id, &job).await {
                        tracing::warn!(%scan_id, %error, "scan attempt failed");
                    }
                });
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.delay) => {}
                _ = self.wake.notified() => {}
            }
        }

        // Attempts already dispatched run to completion.
        while attempts.join_next().await.is_some() {}
        let _ = stats.await;
        tracing::info!("scanner stopped");
    }

    /// Emit the active-scan gauge until stopped.
    async fn emit_stats(self: Arc<Self>) {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            let active_scans = self.active_jobs();
            tracing::info!(target: "uz_scanner::metrics", active_scans, "scanner.active_scans");

            tokio::select! {
                _ = tokio::time::sleep(self.config.metric_interval) => {}
                _ = self.wake.notified() => {}
            }
        }
    }

    /// One booking attempt for one job.
    ///
    /// Skips silently when a prior attempt still holds the guard.
    /// Business errors at coach and seat granularity are expected and
    /// swallowed; every other error propagates to the dispatch wrapper
    /// without touching the job's registry entry.
    async fn scan(&self, scan_id: &str, job: &Arc<ScanJob>) -> Result<(), ClientError> {
        let Ok(_guard) = job.guard.try_lock() else {
            return Ok(());
        };

        let attempt = job.record_attempt();
        tracing::debug!(scan_id, attempt, "scan attempt");

        let request = &job.request;
        let Some(train) = self
            .client
            .fetch_train(
                request.date,
                &request.source,
                &request.destination,
                &request.train_number,
            )
            .await?
        else {
            job.set_error(format!("Train {} not found", request.train_number));
            return Ok(());
        };

        let coach_types: Vec<CoachType> = match &request.coach_type {
            Some(letter) => match train.find_coach_type(letter) {
                Some(coach_type) => vec![coach_type.clone()],
                None => {
                    job.set_error(format!("Coach type {letter} not found"));
                    return Ok(());
                }
            },
            None => train.coach_types.clone(),
        };

        match book(
            self.client.as_ref(),
            &train,
            &coach_types,
            &request.first_name,
            &request.last_name,
        )
        .await?
        {
            Some(session_id) => {
                tracing::info!(scan_id, %session_id, "seat booked");
                self.registry.lock().unwrap().remove(scan_id);
                self.notifier
                    .notify(&request.callback_ref, &session_id)
                    .await;
            }
            None => job.set_error("No available seats".to_string()),
        }
        Ok(())
    }
}

/// Walk coach types → coaches → seats in site order and book the first
/// seat that sticks.
///
/// Runs on its own session so the reservation's cookie state is not
/// shared with the scanner's listing traffic. "Sold out" on a coach and
/// "taken" on a seat are business as usual: skip and try the next one.
async fn book(
    client: &dyn BookingApi,
    train: &Train,
    coach_types: &[CoachType],
    first_name: &str,
    last_name: &str,
) -> Result<Option<String>, ClientError> {
    let session = client.fresh_session()?;

    for coach_type in coach_types {
        for coach in session.list_coaches(train, coach_type).await? {
            let seats = match session.list_seats(train, &coach).await {
                Ok(seats) => seats,
                Err(ClientError::Business(_)) => continue,
                Err(error) => return Err(error),
            };
            for seat in seats {
                match session
                    .book_seat(train, &coach, &seat, first_name, last_name)
                    .await
                {
                    Ok(session_id) => return Ok(Some(session_id)),
                    Err(ClientError::Business(_)) => continue,
                    Err(error) => return Err(error),
                }
            }
        }
    }
    Ok(None)
}
