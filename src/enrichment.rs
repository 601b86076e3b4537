//! Invalidation-aware cache of per-thread detail.
//!
//! The feed tells us a thread changed; the cache answers what state the
//! underlying PR or issue is in. Entries are filled once on first sight and
//! only refreshed by disappearing from the active set and being fetched
//! anew.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tracing as log;

use crate::github::{
    DetailKey, IssueState, Notification, NotificationSource, PullRequestState, SubjectKind,
    ThreadDetail, ThreadState,
};

#[derive(Default)]
pub struct EnrichmentCache {
    entries: HashMap<DetailKey, ThreadDetail>,
}

impl EnrichmentCache {
    pub fn new() -> EnrichmentCache {
        EnrichmentCache::default()
    }

    /// Ensures an entry exists for every enrichable notification, fetching
    /// the missing ones concurrently.
    ///
    /// Keys are deduplicated before dispatch, so two fetches for the same
    /// key cannot race. A failed fetch leaves its key absent for this cycle
    /// and is retried on the next one; present entries are left untouched
    /// until pruned.
    pub async fn fill_missing(
        &mut self,
        source: &dyn NotificationSource,
        notifications: &[Notification],
    ) {
        let mut requested: HashSet<DetailKey> = HashSet::new();
        let mut batch: Vec<DetailKey> = Vec::new();
        for n in notifications {
            let Some(key) = DetailKey::for_notification(n) else {
                continue;
            };
            if self.entries.contains_key(&key) || !requested.insert(key.clone()) {
                continue;
            }
            batch.push(key);
        }
        if batch.is_empty() {
            return;
        }

        log::debug!("enriching {} threads", batch.len());
        let fetches = batch.into_iter().map(|key| async move {
            let detail = source.fetch_details(&key).await;
            (key, detail)
        });
        for (key, result) in join_all(fetches).await {
            match result {
                Ok(detail) => {
                    self.entries.insert(key, detail);
                }
                // Skipped silently this cycle; never surfaced per-item.
                Err(e) => log::debug!("enrichment fetch for {key} failed: {e:#}"),
            }
        }
    }

    /// Drops entries whose thread no longer appears in `notifications`.
    ///
    /// This bounds the cache by the active working set; there is no TTL and
    /// no LRU.
    pub fn prune(&mut self, notifications: &[Notification]) {
        let live: HashSet<DetailKey> = notifications
            .iter()
            .filter_map(DetailKey::for_notification)
            .collect();
        self.entries.retain(|key, _| live.contains(key));
    }

    pub fn detail(&self, key: &DetailKey) -> Option<&ThreadDetail> {
        self.entries.get(key)
    }

    /// PR state for a notification, if enriched already.
    ///
    /// `None` means "not yet determined", never an error.
    pub fn pr_state(&self, n: &Notification) -> Option<PullRequestState> {
        let key = DetailKey::for_notification(n)?;
        if key.kind != SubjectKind::PullRequest {
            return None;
        }
        match self.entries.get(&key)?.state {
            ThreadState::PullRequest(state) => Some(state),
            ThreadState::Issue(_) => None,
        }
    }

    /// Issue state for a notification, if enriched already.
    pub fn issue_state(&self, n: &Notification) -> Option<IssueState> {
        let key = DetailKey::for_notification(n)?;
        if key.kind != SubjectKind::Issue {
            return None;
        }
        match self.entries.get(&key)?.state {
            ThreadState::Issue(state) => Some(state),
            ThreadState::PullRequest(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::tests::notification;

    /// Counts detail fetches and can fail specific keys.
    #[derive(Default)]
    struct CountingSource {
        fetches: AtomicUsize,
        fetched_keys: Mutex<Vec<DetailKey>>,
        fail_numbers: Vec<u64>,
    }

    #[async_trait]
    impl NotificationSource for CountingSource {
        async fn fetch_notifications(&self) -> anyhow::Result<Vec<Notification>> {
            Ok(Vec::new())
        }

        async fn mark_as_read(&self, _thread_id: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn mark_all_as_read(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn fetch_details(&self, key: &DetailKey) -> anyhow::Result<ThreadDetail> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.fetched_keys.lock().unwrap().push(key.clone());
            if self.fail_numbers.contains(&key.number) {
                anyhow::bail!("boom");
            }
            Ok(ThreadDetail {
                state: match key.kind {
                    SubjectKind::PullRequest => {
                        ThreadState::PullRequest(PullRequestState::Open)
                    }
                    SubjectKind::Issue => ThreadState::Issue(IssueState::Open),
                },
                title: format!("thread {}", key.number),
                checks: None,
                latest_comment: None,
                reviews: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn fills_missing_entries_once() {
        let source = CountingSource::default();
        let mut cache = EnrichmentCache::new();
        let list = vec![
            notification().id("a").number(1).build(),
            notification().id("b").number(2).kind("Issue").build(),
            notification().id("c").kind("Release").build(),
        ];

        cache.fill_missing(&source, &list).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);

        // A second pass over the same list fetches nothing: entries are
        // filled once and never refreshed while their key stays active.
        cache.fill_missing(&source, &list).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn duplicate_keys_dispatch_one_fetch() {
        let source = CountingSource::default();
        let mut cache = EnrichmentCache::new();
        // Two distinct notifications referencing the same PR.
        let list = vec![
            notification().id("a").number(7).build(),
            notification().id("b").number(7).build(),
        ];

        cache.fill_missing(&source, &list).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failures_are_skipped_and_retried_next_pass() {
        let source = CountingSource {
            fail_numbers: vec![2],
            ..Default::default()
        };
        let mut cache = EnrichmentCache::new();
        let list = vec![
            notification().id("a").number(1).build(),
            notification().id("b").number(2).build(),
        ];

        cache.fill_missing(&source, &list).await;
        assert_eq!(cache.len(), 1);

        // The failed key is absent, so the next pass asks for it again.
        cache.fill_missing(&source, &list).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn prune_drops_inactive_keys() {
        let source = CountingSource::default();
        let mut cache = EnrichmentCache::new();
        let first = vec![
            notification().id("a").number(1).build(),
            notification().id("b").number(2).build(),
        ];
        cache.fill_missing(&source, &first).await;
        assert_eq!(cache.len(), 2);

        let second = vec![first[0].clone()];
        cache.prune(&second);
        assert_eq!(cache.len(), 1);

        let n = &first[1];
        assert!(cache.pr_state(n).is_none());
        assert!(cache.pr_state(&first[0]).is_some());
    }

    #[tokio::test]
    async fn state_accessors_are_kind_checked() {
        let source = CountingSource::default();
        let mut cache = EnrichmentCache::new();
        let pr = notification().id("a").number(1).build();
        let issue = notification().id("b").number(2).kind("Issue").build();
        cache.fill_missing(&source, &[pr.clone(), issue.clone()]).await;

        assert_eq!(cache.pr_state(&pr), Some(PullRequestState::Open));
        assert_eq!(cache.issue_state(&pr), None);
        assert_eq!(cache.issue_state(&issue), Some(IssueState::Open));
        assert_eq!(cache.pr_state(&issue), None);
    }
}
