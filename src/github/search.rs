//! Wire model for saved-search results.

use chrono::{DateTime, Utc};

/// One result row from the issue/PR search API.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
    pub state: String,
    /// Present on PR results, absent on issues.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl SearchHit {
    pub fn is_pr(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_item_deserializes() {
        let raw = r#"{
            "id": 42,
            "number": 1347,
            "title": "Add frobnication",
            "html_url": "https://github.com/octocat/Hello-World/pull/1347",
            "updated_at": "2025-11-02T14:30:00Z",
            "state": "open",
            "pull_request": { "url": "https://api.github.com/repos/octocat/Hello-World/pulls/1347" }
        }"#;
        let hit: SearchHit = serde_json::from_str(raw).unwrap();
        assert_eq!(hit.id, 42);
        assert!(hit.is_pr());
    }
}
