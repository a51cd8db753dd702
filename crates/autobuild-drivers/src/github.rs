//! GitHub issue tracker client.

use async_trait::async_trait;
use autobuild_core::{IssueRecord, IssueTracker, Secret};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::debug;

use crate::error::{DriverError, Result};

/// Default GitHub REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Subset of the issue-creation response that gets logged.
#[derive(Debug, Deserialize)]
struct CreatedIssue {
    number: u64,
    html_url: String,
}

/// Creates issues with `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Clone)]
pub struct GithubIssueTracker {
    api_url: String,
    http_client: reqwest::Client,
}

impl GithubIssueTracker {
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("autobuild/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            api_url: api_url.into(),
            http_client,
        })
    }

    /// Build the issue-creation request without sending it.
    pub fn request(
        &self,
        token: &Secret,
        repository: &str,
        issue: &IssueRecord,
    ) -> Result<reqwest::Request> {
        let url = format!(
            "{}/repos/{}/issues",
            self.api_url.trim_end_matches('/'),
            repository
        );
        let mut auth = HeaderValue::from_str(&format!("token {}", token.expose()))
            .map_err(|_| DriverError::Http("reporting token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let request = self
            .http_client
            .post(url)
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, "application/vnd.github+json")
            .json(issue)
            .build()?;
        Ok(request)
    }

    async fn send(&self, token: &Secret, repository: &str, issue: &IssueRecord) -> Result<()> {
        let request = self.request(token, repository, issue)?;
        let response = self.http_client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DriverError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        match response.json::<CreatedIssue>().await {
            Ok(created) => debug!(number = created.number, url = %created.html_url, "issue created"),
            Err(e) => debug!(error = %e, "issue created, response not understood"),
        }
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for GithubIssueTracker {
    async fn create_issue(
        &self,
        token: &Secret,
        repository: &str,
        issue: &IssueRecord,
    ) -> autobuild_core::Result<()> {
        Ok(self.send(token, repository, issue).await?)
    }
}
