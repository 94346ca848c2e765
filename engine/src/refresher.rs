//! Keeps the area insights for one selected location fresh.
//!
//! `analyze` is the visible path: it drives the loading flag, reports its error
//! to the caller and (re)starts the polling timer on success. Timer ticks run
//! the same fetch silently; their failures are only logged and never replace
//! data that is already cached.
//!
//! At most one silent fetch runs at a time and ticks that would overlap it are
//! skipped. In-flight fetches are never aborted. Their results are dropped when
//! the location changed, the data was cleared, the refresher was disposed, or a
//! newer visible `analyze` started in the meantime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RefreshConfig;
use crate::models::{AreaInsights, GeoPoint};
use crate::providers::ProviderError;

pub const DEFAULT_TIME_RANGE: &str = "24h";

#[async_trait]
pub trait InsightFetcher: Send + Sync {
    async fn fetch(&self, location: GeoPoint, time_range: &str)
        -> Result<AreaInsights, ProviderError>;
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no location selected")]
    NoLocation,
    #[error("refresher has been disposed")]
    Disposed,
    #[error("analysis superseded by a newer request")]
    Superseded,
    #[error("area analysis failed: {0}")]
    Fetch(#[from] ProviderError),
}

/// Read-only view of the refresher state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSnapshot {
    pub data: Option<AreaInsights>,
    pub last_updated: Option<DateTime<Utc>>,
    pub loading: bool,
    pub error: Option<String>,
    pub polling: bool,
    pub location: Option<GeoPoint>,
    pub time_range: String,
}

#[derive(Debug)]
struct State {
    location: Option<GeoPoint>,
    time_range: String,
    data: Option<AreaInsights>,
    last_updated: Option<DateTime<Utc>>,
    loading: bool,
    error: Option<String>,
    /// Bumped on location change, `clear_data` and `dispose`.
    generation: u64,
    /// Bumped by every visible `analyze`.
    visible_epoch: u64,
    silent_in_flight: bool,
    timer: Option<JoinHandle<()>>,
    /// Identifies the live timer; ticks from an older one are ignored.
    timer_seq: u64,
    disposed: bool,
}

impl State {
    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::debug!("insight polling stopped");
        }
    }

    fn reset(&mut self) {
        self.stop_timer();
        self.data = None;
        self.last_updated = None;
        self.error = None;
        self.loading = false;
        self.generation += 1;
    }
}

struct Inner {
    fetcher: Arc<dyn InsightFetcher>,
    interval: Duration,
    state: Mutex<State>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_timer(self: &Arc<Self>, state: &mut State) {
        state.stop_timer();
        state.timer_seq += 1;

        let seq = state.timer_seq;
        let period = self.interval;
        let weak = Arc::downgrade(self);
        state.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !Inner::tick(&weak, seq) {
                    break;
                }
            }
        }));
        tracing::debug!("insight polling every {:?}", period);
    }

    /// Returns `false` once this timer should exit.
    fn tick(weak: &Weak<Self>, seq: u64) -> bool {
        let Some(inner) = weak.upgrade() else {
            return false;
        };
        let mut state = inner.state();
        if state.disposed || state.timer_seq != seq || state.timer.is_none() {
            return false;
        }
        if state.silent_in_flight || state.loading {
            tracing::debug!("previous fetch still running, skipping tick");
            return true;
        }
        let Some(location) = state.location else {
            return true;
        };

        state.silent_in_flight = true;
        let generation = state.generation;
        let epoch = state.visible_epoch;
        let time_range = state.time_range.clone();
        drop(state);

        let worker = Arc::clone(&inner);
        tokio::spawn(async move {
            let outcome = worker.fetcher.fetch(location, &time_range).await;
            worker.finish_silent(generation, epoch, outcome);
        });
        true
    }

    fn finish_silent(
        &self,
        generation: u64,
        epoch: u64,
        outcome: Result<AreaInsights, ProviderError>,
    ) {
        let mut state = self.state();
        state.silent_in_flight = false;
        if state.disposed || state.generation != generation || state.visible_epoch != epoch {
            tracing::debug!("discarding superseded background refresh");
            return;
        }
        match outcome {
            Ok(data) => {
                state.data = Some(data);
                state.last_updated = Some(Utc::now());
            }
            Err(err) => tracing::warn!("background refresh failed: {err}"),
        }
    }
}

/// Clears the loading flag when an `analyze` future is dropped mid-fetch.
struct PendingAnalysis<'a> {
    inner: &'a Inner,
    epoch: u64,
    armed: bool,
}

impl Drop for PendingAnalysis<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.state();
        if state.visible_epoch == self.epoch && state.loading {
            state.loading = false;
            tracing::debug!("analysis cancelled before the fetch completed");
        }
    }
}

/// Owner of the cached insights for the selected location.
///
/// Dropping it stops the polling timer.
pub struct InsightRefresher {
    inner: Arc<Inner>,
}

impl InsightRefresher {
    pub fn new(fetcher: Arc<dyn InsightFetcher>, config: RefreshConfig) -> Self {
        let state = State {
            location: None,
            time_range: DEFAULT_TIME_RANGE.to_string(),
            data: None,
            last_updated: None,
            loading: false,
            error: None,
            generation: 0,
            visible_epoch: 0,
            silent_in_flight: false,
            timer: None,
            timer_seq: 0,
            disposed: false,
        };
        Self {
            inner: Arc::new(Inner {
                fetcher,
                interval: config.interval,
                state: Mutex::new(state),
            }),
        }
    }

    /// Select a new location. A different location stops polling and drops
    /// everything cached for the previous one.
    pub fn set_location(&self, location: Option<GeoPoint>) {
        let mut state = self.inner.state();
        let unchanged = match (state.location, location) {
            (Some(current), Some(next)) => current.approx_eq(next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        state.location = location;
        state.reset();
    }

    /// Visible fetch for the current location.
    ///
    /// Errors are returned here and recorded in the snapshot; a successful
    /// fetch restarts the polling timer.
    pub async fn analyze(&self, time_range: &str) -> Result<AreaInsights, RefreshError> {
        let (location, generation, epoch) = {
            let mut state = self.inner.state();
            if state.disposed {
                return Err(RefreshError::Disposed);
            }
            let location = state.location.ok_or(RefreshError::NoLocation)?;
            state.time_range = time_range.to_string();
            state.loading = true;
            state.error = None;
            state.visible_epoch += 1;
            (location, state.generation, state.visible_epoch)
        };

        let mut pending = PendingAnalysis {
            inner: &self.inner,
            epoch,
            armed: true,
        };
        let outcome = self.inner.fetcher.fetch(location, time_range).await;
        pending.armed = false;

        let mut state = self.inner.state();
        if state.disposed {
            return Err(RefreshError::Disposed);
        }
        if state.generation != generation || state.visible_epoch != epoch {
            tracing::debug!("discarding superseded analysis");
            return Err(RefreshError::Superseded);
        }
        state.loading = false;
        match outcome {
            Ok(data) => {
                state.data = Some(data.clone());
                state.last_updated = Some(Utc::now());
                self.inner.start_timer(&mut state);
                tracing::info!("area insights loaded for {:?}", location);
                Ok(data)
            }
            Err(err) => {
                tracing::error!("area analysis failed: {err}");
                state.error = Some(err.to_string());
                Err(RefreshError::Fetch(err))
            }
        }
    }

    /// Drop cached data and stop polling until the next `analyze`.
    pub fn clear_data(&self) {
        self.inner.state().reset();
    }

    /// Stop polling. Calling it again is a no-op.
    pub fn stop(&self) {
        self.inner.state().stop_timer();
    }

    pub fn dispose(&self) {
        let mut state = self.inner.state();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.stop_timer();
        state.generation += 1;
        state.loading = false;
    }

    pub fn is_polling(&self) -> bool {
        self.inner.state().timer.is_some()
    }

    pub fn snapshot(&self) -> InsightSnapshot {
        let state = self.inner.state();
        InsightSnapshot {
            data: state.data.clone(),
            last_updated: state.last_updated,
            loading: state.loading,
            error: state.error.clone(),
            polling: state.timer.is_some(),
            location: state.location,
            time_range: state.time_range.clone(),
        }
    }
}

impl Drop for InsightRefresher {
    fn drop(&mut self) {
        self.dispose();
    }
}
