//! Shared HTTP plumbing for the GitHub REST API.

use crate::config::GitHubConfig;
use crate::types::DocumentReference;
use reqwest::{Client, RequestBuilder};

/// Thin wrapper holding the HTTP client, API root, and optional token.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig, token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// `GET {base}/repos/{collection}/{tail}` with auth and API version headers.
    pub fn get_repo(&self, reference: &DocumentReference, tail: &str) -> RequestBuilder {
        let url = format!(
            "{}/repos/{}/{}",
            self.base_url,
            reference.collection_id(),
            tail
        );
        let mut request = self
            .client
            .get(url)
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }
        request
    }
}

/// Percent-encode each path segment, keeping the separators.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
