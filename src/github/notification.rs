//! Data model for entries of the GitHub notifications feed.

use chrono::{DateTime, Utc};

/// A single activity-thread entry as returned by the notifications feed.
///
/// Entries are rebuilt fresh on every poll and never mutated; the previous
/// poll's entries survive only as an id-set used for new-item detection.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Notification {
    /// Opaque thread identifier, unique within the feed.
    pub id: String,
    pub unread: bool,
    pub reason: Reason,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_read_at: Option<DateTime<Utc>>,
    pub subject: Subject,
    pub repository: Repository,
}

/// What the thread is about.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Subject {
    pub title: String,
    /// API URL of the underlying issue/PR/commit. Absent for some subject
    /// types (e.g. repository invitations).
    #[serde(default)]
    pub url: Option<String>,
    /// Raw subject type string as sent by the server.
    ///
    /// Kept verbatim so rules can target type strings this crate does not
    /// recognize yet; use [`Notification::notification_type`] for the parsed
    /// form.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Why the feed included a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Assign,
    Author,
    Comment,
    CiActivity,
    Invitation,
    Manual,
    Mention,
    ReviewRequested,
    SecurityAlert,
    StateChange,
    Subscribed,
    TeamMention,
    /// Reasons the server may add later; decoding never fails on them.
    #[serde(other)]
    Unknown,
}

impl Reason {
    /// The wire string, as rule conditions see it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Assign => "assign",
            Reason::Author => "author",
            Reason::Comment => "comment",
            Reason::CiActivity => "ci_activity",
            Reason::Invitation => "invitation",
            Reason::Manual => "manual",
            Reason::Mention => "mention",
            Reason::ReviewRequested => "review_requested",
            Reason::SecurityAlert => "security_alert",
            Reason::StateChange => "state_change",
            Reason::Subscribed => "subscribed",
            Reason::TeamMention => "team_mention",
            Reason::Unknown => "unknown",
        }
    }
}

/// Parsed form of `subject.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    PullRequest,
    Issue,
    Commit,
    Release,
    Discussion,
    CheckSuite,
    RepositoryInvitation,
    RepositoryVulnerabilityAlert,
    Unknown,
}

impl NotificationType {
    pub fn from_subject_type(raw: &str) -> NotificationType {
        match raw {
            "PullRequest" => NotificationType::PullRequest,
            "Issue" => NotificationType::Issue,
            "Commit" => NotificationType::Commit,
            "Release" => NotificationType::Release,
            "Discussion" => NotificationType::Discussion,
            "CheckSuite" => NotificationType::CheckSuite,
            "RepositoryInvitation" => NotificationType::RepositoryInvitation,
            "RepositoryVulnerabilityAlert" => NotificationType::RepositoryVulnerabilityAlert,
            _ => NotificationType::Unknown,
        }
    }

    /// Only issue and PR threads are eligible for alerts and enrichment.
    pub fn is_thread(&self) -> bool {
        matches!(
            self,
            NotificationType::PullRequest | NotificationType::Issue
        )
    }
}

impl Notification {
    pub fn notification_type(&self) -> NotificationType {
        NotificationType::from_subject_type(&self.subject.kind)
    }

    /// Number of the underlying issue or PR, parsed from the trailing path
    /// segment of the subject URL.
    ///
    /// `None` means there is nothing to enrich by (commits, releases, ...).
    pub fn thread_number(&self) -> Option<u64> {
        // https://api.github.com/repos/rust-lang/rust/pulls/69257
        let url = url::Url::parse(self.subject.url.as_deref()?).ok()?;
        url.path_segments()?.next_back()?.parse().ok()
    }

    /// Key used to aggregate notifications for display.
    ///
    /// The feed carries no shared thread key, so every notification forms its
    /// own group.
    pub fn group_key(&self) -> &str {
        &self.id
    }
}
