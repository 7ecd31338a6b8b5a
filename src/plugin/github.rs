use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::config::GitHubConfig;
use crate::model::repo::{Branch, Credentials, RepositoryRef};

pub const API_ACCEPT: &str = "application/vnd.github.v3+json";

/// Downloads the source archive of a branch.
pub trait ArchiveFetcher {
    fn fetch_archive(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        creds: &Credentials,
    ) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    web_url: String,
    user_agent: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        // Blocking reqwest defaults to a 30s timeout; calls here wait indefinitely.
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(Error::transport)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            web_url: config.web_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn branches_url(&self, repo: &RepositoryRef) -> String {
        format!("{}/repos/{}/{}/branches", self.api_url, repo.owner, repo.name)
    }

    pub fn archive_url(&self, repo: &RepositoryRef, branch: &str) -> String {
        format!(
            "{}/{}/{}/archive/refs/heads/{branch}.zip",
            self.web_url, repo.owner, repo.name
        )
    }

    /// Branches of `repo`, first API page only.
    ///
    /// Never fails: transport and decoding problems are logged and yield an
    /// empty list, which callers treat as "no branches available".
    pub fn list_branches(&self, repo: &RepositoryRef, creds: &Credentials) -> Vec<Branch> {
        let url = self.branches_url(repo);
        let response = self.get(&url, creds).header(ACCEPT, API_ACCEPT).send();

        let body = match response.and_then(|response| response.text()) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!("Error fetching branches for {repo}: {err}");
                return Vec::new();
            }
        };

        parse_branch_list(&body)
    }

    fn get(&self, url: &str, creds: &Credentials) -> RequestBuilder {
        let request = self.client.get(url).header(USER_AGENT, &self.user_agent);
        if creds.is_anonymous() {
            request
        } else {
            request.header(AUTHORIZATION, format!("token {}", creds.token()))
        }
    }
}

impl ArchiveFetcher for GitHubClient {
    fn fetch_archive(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        creds: &Credentials,
    ) -> Result<Vec<u8>> {
        let url = self.archive_url(repo, branch);
        tracing::info!("downloading {url}");

        let response = self
            .get(&url, creds)
            .send()
            .map_err(|err| Error::Transport(format!("Download error: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "Download error: HTTP {status} for {url}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|err| Error::Transport(format!("Download error: {err}")))?;
        tracing::debug!("downloaded {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Branch names from a branches API body, in response order. Malformed
/// bodies are logged and yield an empty list.
pub fn parse_branch_list(body: &str) -> Vec<Branch> {
    decode_branch_list(body).unwrap_or_else(|err| {
        tracing::warn!("JSON error: {err}");
        Vec::new()
    })
}

/// Like [`parse_branch_list`] but reports undecodable JSON as
/// [`Error::Parse`]. A well-formed non-list body decodes to no branches.
pub fn decode_branch_list(body: &str) -> Result<Vec<Branch>> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| Error::Parse(err.to_string()))?;

    let Value::Array(items) = value else {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("response is not a list");
        tracing::warn!("branches API returned no list: {message}");
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Branch>(item).ok())
        .collect())
}
