//! Saved-search polling.
//!
//! Shares the notification pipeline's shape: fetch, diff result ids against
//! a per-search baseline, alert only on genuinely new results, first poll
//! adopts silently.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing as log;
use uuid::Uuid;

use crate::alerts::AlertSink;
use crate::github::{SearchHit, SearchSource};

/// A user-defined search whose new results should alert.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SavedSearch {
    pub id: Uuid,
    pub name: String,
    /// GitHub search syntax, e.g. `is:open is:pr review-requested:@me`.
    pub query: String,
}

impl SavedSearch {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> SavedSearch {
        SavedSearch {
            id: Uuid::new_v4(),
            name: name.into(),
            query: query.into(),
        }
    }
}

pub struct SearchWatcher<S, A> {
    source: S,
    alerts: A,
    searches: Vec<SavedSearch>,
    /// Result-id baselines per search. A search with no baseline yet is on
    /// its first poll and adopts silently.
    baselines: HashMap<Uuid, HashSet<u64>>,
    results: HashMap<Uuid, Vec<SearchHit>>,
}

impl<S: SearchSource, A: AlertSink> SearchWatcher<S, A> {
    pub fn new(source: S, alerts: A, searches: Vec<SavedSearch>) -> Self {
        SearchWatcher {
            source,
            alerts,
            searches,
            baselines: HashMap::new(),
            results: HashMap::new(),
        }
    }

    pub fn searches(&self) -> &[SavedSearch] {
        &self.searches
    }

    /// Latest results for a search, empty until its first successful poll.
    pub fn results(&self, id: Uuid) -> &[SearchHit] {
        self.results.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_search(&mut self, search: SavedSearch) {
        self.searches.push(search);
    }

    /// Removes a search and everything remembered about it.
    pub fn remove_search(&mut self, id: Uuid) {
        self.searches.retain(|s| s.id != id);
        self.baselines.remove(&id);
        self.results.remove(&id);
    }

    /// Polls every saved search once. Per-search failures are isolated.
    pub async fn poll_all(&mut self) {
        let searches = self.searches.clone();
        for search in &searches {
            self.poll(search).await;
        }
    }

    async fn poll(&mut self, search: &SavedSearch) {
        let hits = match self.source.search(&search.query).await {
            Ok(hits) => hits,
            Err(e) => {
                // Baseline untouched; retried next poll.
                log::warn!("search '{}' failed: {e:#}", search.name);
                return;
            }
        };

        let current: HashSet<u64> = hits.iter().map(|h| h.id).collect();
        if let Some(baseline) = self.baselines.get(&search.id) {
            let fresh: Vec<SearchHit> = hits
                .iter()
                .filter(|h| !baseline.contains(&h.id))
                .cloned()
                .collect();
            if !fresh.is_empty() {
                log::debug!("search '{}': {} new results", search.name, fresh.len());
                self.alerts.send_search_hits(&search.name, &fresh);
            }
        }
        self.baselines.insert(search.id, current);
        self.results.insert(search.id, hits);
    }

    /// Drives the watcher until `shutdown` flips. Same no-overlap discipline
    /// as the reconciler: one poll pass at a time, ticks coalesce.
    pub async fn run(mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> Self {
        if self.searches.is_empty() {
            log::debug!("no saved searches configured");
            return self;
        }
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = timer.tick() => {}
                _ = shutdown.changed() => break,
            }
            self.poll_all().await;
        }
        log::info!("search watcher stopped");
        self
    }
}
