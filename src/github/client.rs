use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use tracing as log;

use crate::github::detail::{
    CheckRunsWire, CheckStatus, CommentSummary, CommentWire, IssueState, IssueWire,
    PullRequestState, PullRequestWire, ReviewSummary, ReviewWire, ThreadState,
};
use crate::github::{
    DetailKey, Notification, NotificationSource, SearchHit, SearchSource, SubjectKind,
    ThreadDetail,
};

const PER_PAGE: usize = 50;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Finds the token in the user's environment, panicking if no suitable token
/// can be found.
pub fn default_token_from_env() -> SecretString {
    std::env::var("GITHUB_TOKEN")
        .or_else(|_| std::env::var("GITHUB_API_TOKEN"))
        .expect("could not find token in GITHUB_TOKEN or GITHUB_API_TOKEN")
        .into()
}

#[derive(Clone)]
pub struct GithubClient {
    token: SecretString,
    client: Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(token: SecretString, api_url: String) -> Self {
        GithubClient {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build reqwest client"),
            token,
            api_url,
        }
    }

    pub fn new_from_env() -> Self {
        Self::new(
            default_token_from_env(),
            std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
        )
    }

    async fn send_req(&self, req: RequestBuilder) -> anyhow::Result<Vec<u8>> {
        log::trace!("send_req with {:?}", req);
        let req_dbg = format!("{req:?}");
        let req = req
            .build()
            .with_context(|| format!("building reqwest {req_dbg}"))?;

        let resp = self.client.execute(req).await?;
        let maybe_err = resp.error_for_status_ref().err();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("failed to read response body {req_dbg}"))?;
        if let Some(e) = maybe_err {
            return Err(anyhow::Error::new(e))
                .with_context(|| format!("response: {}", String::from_utf8_lossy(&body)));
        }

        Ok(body.to_vec())
    }

    async fn json<T>(&self, req: RequestBuilder) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let body = self.send_req(req).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        log::trace!("get {:?}", url);
        self.client.get(url).configure(self)
    }

    fn patch(&self, url: &str) -> RequestBuilder {
        log::trace!("patch {:?}", url);
        self.client.patch(url).configure(self)
    }

    fn put(&self, url: &str) -> RequestBuilder {
        log::trace!("put {:?}", url);
        self.client.put(url).configure(self)
    }

    fn repo_url(&self, key: &DetailKey) -> String {
        format!("{}/repos/{}/{}", self.api_url, key.owner, key.repo)
    }

    /// All pages of the notifications feed.
    async fn list_notifications(&self) -> anyhow::Result<Vec<Notification>> {
        let mut notifications = Vec::new();
        let mut page = 1;
        loop {
            let req = self.get(&format!(
                "{}/notifications?page={page}&per_page={PER_PAGE}",
                self.api_url
            ));
            let batch: Vec<Notification> = self
                .json(req)
                .await
                .with_context(|| format!("failed to fetch notifications page {page}"))?;
            let full_page = batch.len() == PER_PAGE;
            notifications.extend(batch);
            if !full_page {
                break;
            }
            page += 1;
        }
        Ok(notifications)
    }

    async fn pull_request_detail(&self, key: &DetailKey) -> anyhow::Result<ThreadDetail> {
        let repo_url = self.repo_url(key);
        let pr: PullRequestWire = self
            .json(self.get(&format!("{repo_url}/pulls/{}", key.number)))
            .await
            .with_context(|| format!("failed to fetch detail for {key}"))?;

        // CI status, discussion and review context are decorations; losing
        // any of them must not fail the enrichment.
        let checks = match &pr.head {
            Some(head) => self
                .check_status(&repo_url, &head.sha)
                .await
                .unwrap_or_else(|e| {
                    log::debug!("check-run fetch for {key} failed: {e:#}");
                    None
                }),
            None => None,
        };
        let latest_comment = self
            .latest_comment(&repo_url, key.number)
            .await
            .unwrap_or_else(|e| {
                log::debug!("comment fetch for {key} failed: {e:#}");
                None
            });
        let reviews = self.reviews(&repo_url, key.number).await.unwrap_or_else(|e| {
            log::debug!("review fetch for {key} failed: {e:#}");
            Vec::new()
        });

        Ok(ThreadDetail {
            state: ThreadState::PullRequest(PullRequestState::derive(
                pr.merged, &pr.state, pr.draft,
            )),
            title: pr.title,
            checks,
            latest_comment,
            reviews,
        })
    }

    async fn issue_detail(&self, key: &DetailKey) -> anyhow::Result<ThreadDetail> {
        let repo_url = self.repo_url(key);
        let issue: IssueWire = self
            .json(self.get(&format!("{repo_url}/issues/{}", key.number)))
            .await
            .with_context(|| format!("failed to fetch detail for {key}"))?;

        let latest_comment = self
            .latest_comment(&repo_url, key.number)
            .await
            .unwrap_or_else(|e| {
                log::debug!("comment fetch for {key} failed: {e:#}");
                None
            });

        Ok(ThreadDetail {
            state: ThreadState::Issue(IssueState::derive(
                &issue.state,
                issue.state_reason.as_deref(),
            )),
            title: issue.title,
            checks: None,
            latest_comment,
            reviews: Vec::new(),
        })
    }

    async fn check_status(&self, repo_url: &str, sha: &str) -> anyhow::Result<Option<CheckStatus>> {
        let runs: CheckRunsWire = self
            .json(self.get(&format!("{repo_url}/commits/{sha}/check-runs")))
            .await?;
        Ok(CheckStatus::from_runs(&runs.check_runs))
    }

    async fn latest_comment(
        &self,
        repo_url: &str,
        number: u64,
    ) -> anyhow::Result<Option<CommentSummary>> {
        let req = self.get(&format!(
            "{repo_url}/issues/{number}/comments?per_page=1&sort=created&direction=desc"
        ));
        let comments: Vec<CommentWire> = self.json(req).await?;
        Ok(comments.into_iter().next().map(|c| CommentSummary {
            author: c.user.login,
            body: c.body,
            created_at: c.created_at,
        }))
    }

    async fn reviews(&self, repo_url: &str, number: u64) -> anyhow::Result<Vec<ReviewSummary>> {
        let req = self.get(&format!("{repo_url}/pulls/{number}/reviews?per_page=10"));
        let reviews: Vec<ReviewWire> = self.json(req).await?;
        Ok(reviews
            .into_iter()
            .map(|r| ReviewSummary {
                author: r.user.login,
                state: r.state,
                submitted_at: r.submitted_at,
            })
            .collect())
    }
}

#[async_trait]
impl NotificationSource for GithubClient {
    async fn fetch_notifications(&self) -> anyhow::Result<Vec<Notification>> {
        self.list_notifications().await
    }

    async fn mark_as_read(&self, thread_id: &str) -> anyhow::Result<()> {
        let url = format!("{}/notifications/threads/{thread_id}", self.api_url);
        self.send_req(self.patch(&url))
            .await
            .with_context(|| format!("failed to mark thread {thread_id} as read"))?;
        Ok(())
    }

    async fn mark_all_as_read(&self) -> anyhow::Result<()> {
        let url = format!("{}/notifications", self.api_url);
        self.send_req(self.put(&url).json(&serde_json::json!({ "read": true })))
            .await
            .context("failed to mark all notifications as read")?;
        Ok(())
    }

    async fn fetch_details(&self, key: &DetailKey) -> anyhow::Result<ThreadDetail> {
        match key.kind {
            SubjectKind::PullRequest => self.pull_request_detail(key).await,
            SubjectKind::Issue => self.issue_detail(key).await,
        }
    }
}

#[async_trait]
impl SearchSource for GithubClient {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>> {
        #[derive(serde::Deserialize)]
        struct SearchResponse {
            items: Vec<SearchHit>,
        }
        let req = self
            .get(&format!("{}/search/issues", self.api_url))
            .query(&[("q", query), ("per_page", "50")]);
        let resp: SearchResponse = self
            .json(req)
            .await
            .with_context(|| format!("search failed for query {query:?}"))?;
        Ok(resp.items)
    }
}

trait RequestSend: Sized {
    fn configure(self, g: &GithubClient) -> Self;
}

impl RequestSend for RequestBuilder {
    fn configure(self, g: &GithubClient) -> RequestBuilder {
        let mut auth = reqwest::header::HeaderValue::from_maybe_shared(format!(
            "token {}",
            g.token.expose_secret()
        ))
        .unwrap();
        auth.set_sensitive(true);
        self.header(USER_AGENT, "inboxbot")
            .header(AUTHORIZATION, &auth)
    }
}
