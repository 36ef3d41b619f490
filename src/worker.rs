//! Polling Worker
//!
//! Runs one cycle as soon as it starts, then one per interval at a fixed
//! rate. A cycle fetches and stores the current weather for every registered
//! location in registry order. A location that fails is logged, counted and
//! skipped; it never affects the other locations or the worker itself.
//!
//! On cancellation the wait between cycles ends immediately. Inside a cycle
//! the location in flight is finished and the remaining ones are abandoned.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::WeatherSvcError;
use crate::models::Location;
use crate::registry::LocationRegistry;
use crate::store::WeatherStore;
use crate::weather::WeatherFetcher;

/// Lifecycle of a [`PollingWorker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, first cycle not started yet
    Idle,
    /// Executing a cycle
    Running,
    /// Between cycles
    Waiting,
    /// Cancelled; no further cycles
    Stopped,
}

/// Which step of a location's processing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Fetching the current weather from upstream
    Fetch,
    /// Persisting the fetched reading
    Save,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Fetch => write!(f, "get current"),
            FailureStage::Save => write!(f, "save"),
        }
    }
}

/// A location that failed during a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFailure {
    /// Registry name of the location
    pub location: String,
    pub stage: FailureStage,
    /// Rendered error
    pub error: String,
}

/// Outcome of one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSummary {
    /// Locations in the registry
    pub total: usize,
    /// Locations processed before the cycle ended
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<LocationFailure>,
    /// The cycle stopped early because of cancellation
    pub cancelled: bool,
}

impl CycleSummary {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Successful: {} of {}", self.succeeded, self.total)
    }
}

/// Periodically fetches and persists weather for every registered location
pub struct PollingWorker {
    registry: Arc<LocationRegistry>,
    fetcher: Arc<dyn WeatherFetcher>,
    store: Arc<dyn WeatherStore>,
    interval: Duration,
    state: watch::Sender<WorkerState>,
}

impl PollingWorker {
    pub fn new(
        registry: Arc<LocationRegistry>,
        fetcher: Arc<dyn WeatherFetcher>,
        store: Arc<dyn WeatherStore>,
        interval: Duration,
    ) -> crate::Result<Self> {
        if interval.is_zero() {
            return Err(WeatherSvcError::config("worker interval must be positive"));
        }
        let (state, _) = watch::channel(WorkerState::Idle);
        Ok(Self {
            registry,
            fetcher,
            store,
            interval,
            state,
        })
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch state transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run cycles until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            locations = self.registry.len(),
            "Worker started"
        );

        // first tick completes immediately
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.state.send_replace(WorkerState::Running);
            let summary = self.run_cycle(&cancel).await;
            if summary.cancelled || cancel.is_cancelled() {
                break;
            }
            self.state.send_replace(WorkerState::Waiting);
        }

        self.state.send_replace(WorkerState::Stopped);
        info!("Worker stopped");
    }

    /// Process every registered location once.
    #[instrument(name = "poll_cycle", skip_all)]
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleSummary {
        let started = Instant::now();
        let locations = self.registry.locations();
        let mut summary = CycleSummary {
            total: locations.len(),
            ..CycleSummary::default()
        };

        for location in locations {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                info!(
                    remaining = summary.total - summary.attempted,
                    "Cancellation requested, abandoning remaining locations"
                );
                break;
            }

            summary.attempted += 1;
            match self.process_location(location).await {
                Ok(()) => summary.succeeded += 1,
                Err((stage, err)) => {
                    warn!(location = %location.name, "[ERR] {}: {}", stage, err);
                    summary.failures.push(LocationFailure {
                        location: location.name.clone(),
                        stage,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            failed = summary.failed(),
            "Loop complete. {}",
            summary
        );
        summary
    }

    async fn process_location(
        &self,
        location: &Location,
    ) -> Result<(), (FailureStage, WeatherSvcError)> {
        let reading = self
            .fetcher
            .get_current(location)
            .await
            .map_err(|e| (FailureStage::Fetch, e))?;
        self.store
            .save(&reading)
            .await
            .map_err(|e| (FailureStage::Save, e))?;
        Ok(())
    }
}
