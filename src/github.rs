pub(crate) mod client;
pub mod detail;
pub mod notification;
pub mod search;

pub use client::{GithubClient, default_token_from_env};
pub use detail::*;
pub use notification::*;
pub use search::SearchHit;

use async_trait::async_trait;

/// Feed-side collaborator the reconciler consumes.
///
/// [`GithubClient`] is the production implementation; tests substitute
/// in-memory stubs. Failures are surfaced as-is; retry policy belongs to the
/// poll cycle, not the transport.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// The full current notifications feed.
    async fn fetch_notifications(&self) -> anyhow::Result<Vec<Notification>>;

    /// Marks a single thread as read.
    async fn mark_as_read(&self, thread_id: &str) -> anyhow::Result<()>;

    /// Marks every thread as read.
    async fn mark_all_as_read(&self) -> anyhow::Result<()>;

    /// Detail for one issue or PR. Independently failable per key.
    async fn fetch_details(&self, key: &DetailKey) -> anyhow::Result<ThreadDetail>;
}

/// Search-side collaborator the search watcher consumes.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Results for a query in GitHub search syntax.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>>;
}
