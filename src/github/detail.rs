//! Enrichment detail for the issue or PR behind a notification.
//!
//! The feed itself only says "something happened on this thread"; the detail
//! fetch answers what state the thread is actually in (merged, closed as not
//! planned, CI red, ...).

use chrono::{DateTime, Utc};

use crate::github::{Notification, NotificationType};

/// Whether a thread points at a pull request or an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    PullRequest,
    Issue,
}

/// Cache key for enrichment lookups.
///
/// Structured on purpose: a formatted `"{owner}/{repo}/{kind}/{number}"`
/// string would let producer and consumer drift apart silently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailKey {
    pub owner: String,
    pub repo: String,
    pub kind: SubjectKind,
    pub number: u64,
}

impl DetailKey {
    /// The key for a notification, if it is enrichable at all.
    ///
    /// Non-thread subject types and threads without a resolvable number have
    /// no key and are never enriched.
    pub fn for_notification(n: &Notification) -> Option<DetailKey> {
        let kind = match n.notification_type() {
            NotificationType::PullRequest => SubjectKind::PullRequest,
            NotificationType::Issue => SubjectKind::Issue,
            _ => return None,
        };
        Some(DetailKey {
            owner: n.repository.owner.login.clone(),
            repo: n.repository.name.clone(),
            kind,
            number: n.thread_number()?,
        })
    }
}

impl std::fmt::Display for DetailKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            SubjectKind::PullRequest => "pull",
            SubjectKind::Issue => "issue",
        };
        write!(f, "{}/{}#{} ({kind})", self.owner, self.repo, self.number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
    Draft,
}

impl PullRequestState {
    /// Derivation order matters: merged PRs also report `state == "closed"`,
    /// and a draft PR that was closed counts as closed, not draft.
    pub fn derive(merged: bool, state: &str, draft: bool) -> PullRequestState {
        if merged {
            PullRequestState::Merged
        } else if state == "closed" {
            PullRequestState::Closed
        } else if draft {
            PullRequestState::Draft
        } else {
            PullRequestState::Open
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    ClosedCompleted,
    ClosedNotPlanned,
}

impl IssueState {
    pub fn derive(state: &str, state_reason: Option<&str>) -> IssueState {
        if state == "closed" {
            if state_reason == Some("completed") {
                IssueState::ClosedCompleted
            } else {
                IssueState::ClosedNotPlanned
            }
        } else {
            IssueState::Open
        }
    }
}

/// State of the thread behind a notification, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    PullRequest(PullRequestState),
    Issue(IssueState),
}

/// Rolled-up CI outcome for a PR's head commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pending,
    Success,
    Failure,
}

impl CheckStatus {
    /// Rollup over individual check runs: any failed run wins, then any run
    /// still in flight, then success. No runs at all means no status.
    pub fn from_runs(runs: &[CheckRunWire]) -> Option<CheckStatus> {
        if runs.is_empty() {
            return None;
        }
        let failed = runs.iter().any(|run| {
            matches!(
                run.conclusion.as_deref(),
                Some("failure" | "timed_out" | "cancelled")
            )
        });
        if failed {
            return Some(CheckStatus::Failure);
        }
        if runs.iter().any(|run| run.status != "completed") {
            return Some(CheckStatus::Pending);
        }
        Some(CheckStatus::Success)
    }
}

#[derive(Debug, Clone)]
pub struct CommentSummary {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReviewSummary {
    pub author: String,
    pub state: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Detail payload fetched once per active thread.
#[derive(Debug, Clone)]
pub struct ThreadDetail {
    pub state: ThreadState,
    pub title: String,
    pub checks: Option<CheckStatus>,
    pub latest_comment: Option<CommentSummary>,
    pub reviews: Vec<ReviewSummary>,
}

// Wire shapes for the REST detail endpoints.

#[derive(Debug, serde::Deserialize)]
pub(crate) struct PullRequestWire {
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub head: Option<CommitRefWire>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct CommitRefWire {
    pub sha: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct IssueWire {
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub state_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct CheckRunWire {
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct CheckRunsWire {
    pub check_runs: Vec<CheckRunWire>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct CommentWire {
    pub user: ActorWire,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ReviewWire {
    pub user: ActorWire,
    pub state: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ActorWire {
    pub login: String,
}
