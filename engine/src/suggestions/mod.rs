//! Location suggestions merged from an intent-prediction service and a generic
//! autocomplete service.
//!
//! Both sources are queried concurrently under a per-source deadline. A source
//! that errors or times out contributes nothing; the other one still counts.
//! Predicted-intent results always come first, duplicates (by place id or by
//! normalized label) are dropped, and when the merged list is empty the
//! built-in gazetteer answers instead.
//!
//! [`SuggestionField`] sits on top of the aggregator and models one input
//! field: every keystroke starts a new search and only the newest one is
//! allowed to publish its results.

pub mod gazetteer;
pub mod sources;

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::SuggestionConfig;
use crate::models::LocationSuggestion;

pub use sources::{
    AutocompleteSource, PredictedIntentSource, SearchHints, SourceError,
};
use sources::{normalize_autocomplete, normalize_predicted};

pub struct SuggestionAggregator {
    predicted: Arc<dyn PredictedIntentSource>,
    autocomplete: Arc<dyn AutocompleteSource>,
    config: SuggestionConfig,
}

impl SuggestionAggregator {
    pub fn new(
        predicted: Arc<dyn PredictedIntentSource>,
        autocomplete: Arc<dyn AutocompleteSource>,
        config: SuggestionConfig,
    ) -> Self {
        Self {
            predicted,
            autocomplete,
            config,
        }
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    pub fn hints(&self) -> SearchHints {
        SearchHints::for_city(&self.config.city)
    }

    /// Whether `query` is long enough to hit the sources at all.
    pub fn accepts(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.config.min_query_len
    }

    pub async fn search(&self, query: &str) -> Vec<LocationSuggestion> {
        if !self.accepts(query) {
            return Vec::new();
        }
        let query = query.trim();
        let hints = self.hints();
        let limit = self.config.source_timeout;

        let (predicted, generic) = tokio::join!(
            within(limit, self.predicted.predict(query, &hints)),
            within(limit, self.autocomplete.autocomplete(query, &hints)),
        );

        let predicted = settle("predicted-intent", predicted)
            .into_iter()
            .filter_map(|place| normalize_predicted(place, &self.config.city));
        let generic = settle("autocomplete", generic)
            .into_iter()
            .filter_map(normalize_autocomplete);

        let merged = merge_unique(predicted.chain(generic));
        if !merged.is_empty() {
            return merged;
        }
        tracing::info!("no live suggestions for {query:?}, answering from the gazetteer");
        gazetteer::lookup(query)
    }
}

async fn within<T>(
    limit: Duration,
    request: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, SourceError> {
    tokio::time::timeout(limit, request)
        .await
        .unwrap_or(Err(SourceError::Timeout(limit)))
}

fn settle<T>(source: &str, outcome: Result<Vec<T>, SourceError>) -> Vec<T> {
    outcome.unwrap_or_else(|err| {
        tracing::warn!("{source} source unavailable: {err}");
        Vec::new()
    })
}

fn label_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keep the first occurrence of every place id and every normalized label.
pub fn merge_unique(
    suggestions: impl IntoIterator<Item = LocationSuggestion>,
) -> Vec<LocationSuggestion> {
    let mut ids = HashSet::new();
    let mut labels = HashSet::new();
    let mut merged = Vec::new();

    for suggestion in suggestions {
        let key = label_key(&suggestion.label);
        if ids.contains(&suggestion.place_id) || labels.contains(&key) {
            continue;
        }
        ids.insert(suggestion.place_id.clone());
        labels.insert(key);
        merged.push(suggestion);
    }
    merged
}

/// Identifies one search started on a [`SuggestionField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

/// Latest-request-wins wrapper around [`SuggestionAggregator`].
pub struct SuggestionField {
    aggregator: Arc<SuggestionAggregator>,
    sequence: AtomicU64,
    current: Mutex<Vec<LocationSuggestion>>,
}

impl SuggestionField {
    pub fn new(aggregator: Arc<SuggestionAggregator>) -> Self {
        Self {
            aggregator,
            sequence: AtomicU64::new(0),
            current: Mutex::new(Vec::new()),
        }
    }

    /// Start a new search, superseding every earlier one.
    pub fn begin(&self) -> SearchTicket {
        SearchTicket(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        self.sequence.load(Ordering::SeqCst) == ticket.0
    }

    /// Run a search right away.
    ///
    /// Returns `None` when a newer search started before this one finished;
    /// its results are then discarded and [`current`](Self::current) is left alone.
    pub async fn search(&self, query: &str) -> Option<Vec<LocationSuggestion>> {
        let ticket = self.begin();
        self.run(ticket, query).await
    }

    /// Wait out the debounce window first; a keystroke inside the window
    /// supersedes this search before any source is contacted.
    pub async fn search_debounced(&self, query: &str) -> Option<Vec<LocationSuggestion>> {
        let ticket = self.begin();
        tokio::time::sleep(self.aggregator.config().debounce).await;
        if !self.is_current(ticket) {
            tracing::debug!("search {} superseded during debounce", ticket.0);
            return None;
        }
        self.run(ticket, query).await
    }

    pub fn current(&self) -> Vec<LocationSuggestion> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn run(&self, ticket: SearchTicket, query: &str) -> Option<Vec<LocationSuggestion>> {
        let results = if self.aggregator.accepts(query) {
            self.aggregator.search(query).await
        } else {
            Vec::new()
        };
        self.publish(ticket, results)
    }

    fn publish(
        &self,
        ticket: SearchTicket,
        results: Vec<LocationSuggestion>,
    ) -> Option<Vec<LocationSuggestion>> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(ticket) {
            tracing::debug!("dropping stale results of search {}", ticket.0);
            return None;
        }
        current.clone_from(&results);
        Some(results)
    }
}
