use crate::config::GitHubEndpoints;
use crate::github::models::{
    AccessTokenResponse, Commit, FileContent, GitHubUser, Reference, Repository, Tree,
};
use crate::{Error, Result};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::{debug, error};

/// GitHub API client
///
/// One shared HTTP client; the bearer token is supplied per call because it
/// belongs to whichever user session the request carries.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    endpoints: GitHubEndpoints,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(endpoints: GitHubEndpoints) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("GitCDN/0.1"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, endpoints })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api_url, path)
    }

    async fn send<T>(&self, request: RequestBuilder) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Internal(format!("GitHub API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for_status(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Internal(format!("Failed to parse GitHub API response: {e}")))
    }

    async fn error_for_status(status: StatusCode, response: Response) -> Error {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        error!("GitHub API error: {} - {}", status, error_body);

        match status {
            StatusCode::NOT_FOUND => Error::NotFound("GitHub resource not found".to_string()),
            StatusCode::UNAUTHORIZED => Error::Unauthorized,
            StatusCode::FORBIDDEN => {
                Error::Internal("GitHub API rate limit exceeded".to_string())
            }
            StatusCode::CONFLICT => {
                Error::Conflict("GitHub rejected the write (stale sha)".to_string())
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                Error::Validation("GitHub rejected the request payload".to_string())
            }
            _ => Error::Internal(format!("GitHub API error: {status}")),
        }
    }

    /// Get the authenticated user's identity
    pub async fn get_user(&self, token: &str) -> Result<GitHubUser> {
        let url = self.api_url("/user");
        debug!("GitHub API request: GET {}", url);
        self.send(self.client.get(&url).bearer_auth(token)).await
    }

    /// List the authenticated user's repositories, newest activity first
    pub async fn list_repositories(&self, token: &str) -> Result<Vec<Repository>> {
        const PER_PAGE: usize = 100;
        const MAX_PAGES: usize = 10;

        let mut repositories = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = self.api_url(&format!(
                "/user/repos?per_page={PER_PAGE}&sort=updated&page={page}"
            ));
            debug!("GitHub API request: GET {}", url);
            let batch: Vec<Repository> =
                self.send(self.client.get(&url).bearer_auth(token)).await?;
            let last_page = batch.len() < PER_PAGE;
            repositories.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(repositories)
    }

    /// Get the latest commit SHA for a branch
    pub async fn get_branch_commit(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<String> {
        let url = self.api_url(&format!("/repos/{owner}/{repo}/git/refs/heads/{branch}"));
        debug!("GitHub API request: GET {}", url);
        let reference: Reference = self.send(self.client.get(&url).bearer_auth(token)).await?;
        Ok(reference.object.sha)
    }

    /// Get commit information
    pub async fn get_commit(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Commit> {
        let url = self.api_url(&format!("/repos/{owner}/{repo}/commits/{sha}"));
        debug!("GitHub API request: GET {}", url);
        self.send(self.client.get(&url).bearer_auth(token)).await
    }

    /// Get the full recursive tree for a tree SHA (single call, unpaginated)
    pub async fn get_tree(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        tree_sha: &str,
    ) -> Result<Tree> {
        let url = self.api_url(&format!(
            "/repos/{owner}/{repo}/git/trees/{tree_sha}?recursive=1"
        ));
        debug!("GitHub API request: GET {}", url);
        self.send(self.client.get(&url).bearer_auth(token)).await
    }

    /// Get file content through the contents API
    pub async fn get_content(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        ref_name: &str,
    ) -> Result<FileContent> {
        let url = self.api_url(&format!(
            "/repos/{owner}/{repo}/contents/{path}?ref={ref_name}"
        ));
        debug!("GitHub API request: GET {}", url);
        self.send(self.client.get(&url).bearer_auth(token)).await
    }

    /// Explicit existence probe for a path: `Ok(true)` when present,
    /// `Ok(false)` on a clean 404, `Err` for anything else.
    pub async fn content_exists(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        ref_name: &str,
    ) -> Result<bool> {
        match self.get_content(token, owner, repo, path, ref_name).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create or update a blob through the contents API. `sha` must carry
    /// the current blob sha when updating an existing path.
    #[allow(clippy::too_many_arguments)]
    pub async fn put_content(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
        content_base64: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<()> {
        let url = self.api_url(&format!("/repos/{owner}/{repo}/contents/{path}"));
        debug!("GitHub API request: PUT {}", url);

        let mut body = json!({
            "message": message,
            "content": content_base64,
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("GitHub API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for_status(status, response).await);
        }
        Ok(())
    }

    /// Delete a blob through the contents API. The sha is GitHub's
    /// optimistic-concurrency token; a stale sha fails the delete.
    #[allow(clippy::too_many_arguments)]
    pub async fn delete_content(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
        sha: &str,
        message: &str,
    ) -> Result<()> {
        let url = self.api_url(&format!("/repos/{owner}/{repo}/contents/{path}"));
        debug!("GitHub API request: DELETE {}", url);

        let body = json!({
            "message": message,
            "sha": sha,
            "branch": branch,
        });

        let response = self
            .client
            .delete(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("GitHub API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for_status(status, response).await);
        }
        Ok(())
    }

    /// Exchange an OAuth authorization code for a bearer token
    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<String> {
        let url = format!("{}/login/oauth/access_token", self.endpoints.oauth_url);
        debug!("GitHub OAuth request: POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&json!({
                "client_id": client_id,
                "client_secret": client_secret,
                "code": code,
            }))
            .send()
            .await
            .map_err(|e| Error::Internal(format!("GitHub token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for_status(status, response).await);
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Failed to parse token response: {e}")))?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(access_token),
            _ => {
                let detail = token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| "no access token in response".to_string());
                Err(Error::Internal(format!(
                    "GitHub token exchange failed: {detail}"
                )))
            }
        }
    }
}
