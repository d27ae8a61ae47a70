//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitHub. One client serves
//! every repository: each call names the repository it addresses, so the
//! same `GitHubForge` reads the upstream and writes the fork.
//!
//! Endpoints used:
//! - `GET /repos/{owner}/{repo}` and `POST /repos/{owner}/{repo}/forks`
//! - `GET /repos/{owner}/{repo}/git/ref/{ref}`
//! - `POST /repos/{owner}/{repo}/git/refs`
//! - `PATCH /repos/{owner}/{repo}/git/refs/{ref}`
//! - `GET|PUT /repos/{owner}/{repo}/contents/{path}`
//! - `POST /repos/{owner}/{repo}/pulls`
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation:
//! - Returns `ForgeError::RateLimited` when limits are hit
//! - Does not implement automatic retry (caller's responsibility)
//!
//! # Example
//!
//! ```ignore
//! use forksync::core::types::RepoId;
//! use forksync::forge::github::GitHubForge;
//! use forksync::forge::Forge;
//!
//! let forge = GitHubForge::new("ghp_xxx", "https://api.github.com");
//! let repo = forge
//!     .get_repo(&RepoId::parse_full_name("octocat/hello-world")?)
//!     .await?;
//! println!("default branch: {:?}", repo.default_branch);
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    CommitRef, ContentRef, ContentUpdate, CreatePrRequest, FileContent, Forge, ForgeError,
    GitRef, PrState, PullRequest, PutContentsRequest, Repository,
};
use crate::core::config::{DEFAULT_API_BASE, DEFAULT_USER_AGENT};
use crate::core::types::{BranchName, Oid, RefName, RepoId};

/// GitHub forge implementation.
///
/// Authenticates every request with a bearer token.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Personal access token or app token
    token: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    /// User-Agent header value
    user_agent: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl GitHubForge {
    /// Create a GitHub forge.
    ///
    /// # Arguments
    ///
    /// * `token` - Personal access token or GitHub App token
    /// * `api_base` - API base URL (e.g., `https://github.example.com/api/v3`)
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Create a GitHub forge against `api.github.com`.
    pub fn with_default_api(token: impl Into<String>) -> Self {
        Self::new(token, DEFAULT_API_BASE)
    }

    /// Override the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    ///
    /// Every segment is percent-encoded on its own, so `#`, `?`, `%` and
    /// spaces in branch names or file paths stay inside their segment.
    fn repo_url<'s>(
        &self,
        repo: &RepoId,
        segments: impl IntoIterator<Item = &'s str>,
    ) -> Result<Url, ForgeError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            ForgeError::NetworkError(format!("invalid API base '{}': {}", self.api_base, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ForgeError::NetworkError(format!("API base '{}' cannot take a path", self.api_base))
            })?
            .pop_if_empty()
            .extend(["repos", repo.owner(), repo.name()])
            .extend(segments);
        Ok(url)
    }

    /// Start an authenticated request.
    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, ForgeError> {
        tracing::debug!(%method, %url, "github request");
        Ok(self.client.request(method, url).headers(self.headers()?))
    }

    /// Send a request and decode the JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ForgeError> {
        let response = request
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ForgeError::InvalidResponse(format!("failed to parse response: {}", e)))
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        // Extract headers before consuming response body.
        let headers = response.headers();
        let required_permissions = header_str(headers, "X-Accepted-GitHub-Permissions");
        let rate_limit_exhausted =
            header_str(headers, "X-RateLimit-Remaining").as_deref() == Some("0");

        let body = response
            .json::<GitHubErrorResponse>()
            .await
            .unwrap_or_default();
        let message = if body.message.is_empty() {
            "Unknown error".to_string()
        } else {
            body.message.clone()
        };

        tracing::debug!(status = status.as_u16(), %message, "github error response");

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limit_exhausted => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(perms) = required_permissions.filter(|p| !p.is_empty()) {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::CONFLICT => ForgeError::Conflict(message),
            StatusCode::UNPROCESSABLE_ENTITY => ForgeError::Unprocessable {
                message,
                details: body.details(),
            },
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// URL segments of a git ref endpoint (`git/ref/heads/main`).
fn ref_segments<'a>(endpoint: &'a str, name: &'a RefName) -> impl Iterator<Item = &'a str> {
    ["git", endpoint].into_iter().chain(name.api_path().split('/'))
}

/// URL segments of the contents endpoint for a repository file path.
fn contents_segments(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once("contents").chain(path.trim_start_matches('/').split('/'))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_repo(&self, repo: &RepoId) -> Result<Repository, ForgeError> {
        let url = self.repo_url(repo, std::iter::empty())?;
        let gh: GitHubRepository = self.send(self.request(Method::GET, url)?).await?;
        gh.try_into()
    }

    async fn create_fork(&self, repo: &RepoId) -> Result<Repository, ForgeError> {
        let url = self.repo_url(repo, ["forks"])?;
        let request = self
            .request(Method::POST, url)?
            .json(&serde_json::json!({}));
        let gh: GitHubRepository = self.send(request).await?;
        gh.try_into()
    }

    async fn get_ref(&self, repo: &RepoId, name: &RefName) -> Result<GitRef, ForgeError> {
        let url = self.repo_url(repo, ref_segments("ref", name))?;
        let gh: GitHubGitRef = self.send(self.request(Method::GET, url)?).await?;
        gh.try_into()
    }

    async fn create_ref(
        &self,
        repo: &RepoId,
        name: &RefName,
        sha: &Oid,
    ) -> Result<GitRef, ForgeError> {
        let url = self.repo_url(repo, ["git", "refs"])?;
        let body = CreateRefBody {
            ref_name: name.as_str(),
            sha: sha.as_str(),
        };
        let gh: GitHubGitRef = self
            .send(self.request(Method::POST, url)?.json(&body))
            .await?;
        gh.try_into()
    }

    async fn update_ref(
        &self,
        repo: &RepoId,
        name: &RefName,
        sha: &Oid,
        force: bool,
    ) -> Result<GitRef, ForgeError> {
        let url = self.repo_url(repo, ref_segments("refs", name))?;
        let body = UpdateRefBody {
            sha: sha.as_str(),
            force,
        };
        let gh: GitHubGitRef = self
            .send(self.request(Method::PATCH, url)?.json(&body))
            .await?;
        gh.try_into()
    }

    async fn get_contents(
        &self,
        repo: &RepoId,
        path: &str,
        branch: &BranchName,
    ) -> Result<FileContent, ForgeError> {
        let url = self.repo_url(repo, contents_segments(path))?;
        let request = self
            .request(Method::GET, url)?
            .query(&[("ref", branch.as_str())]);
        let gh: GitHubContent = self.send(request).await?;
        gh.try_into()
    }

    async fn put_contents(
        &self,
        repo: &RepoId,
        request: PutContentsRequest,
    ) -> Result<ContentUpdate, ForgeError> {
        let url = self.repo_url(repo, contents_segments(&request.path))?;
        let body = PutContentsBody {
            message: &request.message,
            content: BASE64.encode(&request.content),
            branch: request.branch.as_str(),
            sha: request.sha.as_deref(),
        };
        let gh: GitHubContentUpdate = self
            .send(self.request(Method::PUT, url)?.json(&body))
            .await?;
        gh.try_into()
    }

    async fn create_pr(
        &self,
        repo: &RepoId,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(repo, ["pulls"])?;
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: request.body.as_deref(),
            draft: request.draft,
        };
        let pr: GitHubPullRequest = self
            .send(self.request(Method::POST, url)?.json(&body))
            .await?;
        Ok(pr.into())
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: &'a str,
    sha: &'a str,
}

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Request body for creating or updating a file.
#[derive(Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    draft: bool,
}

/// GitHub error response format.
///
/// `errors` entries are either plain strings or objects carrying a
/// `message` and/or a `code`.
#[derive(Deserialize, Default)]
struct GitHubErrorResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl GitHubErrorResponse {
    fn details(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(obj) => obj
                    .get("message")
                    .or_else(|| obj.get("code"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                _ => None,
            })
            .collect()
    }
}

/// GitHub repository response format.
#[derive(Deserialize)]
struct GitHubRepository {
    name: String,
    owner: GitHubOwner,
    default_branch: Option<String>,
    html_url: String,
    #[serde(default)]
    fork: bool,
}

/// Minimal GitHub owner info.
#[derive(Deserialize)]
struct GitHubOwner {
    login: String,
}

impl TryFrom<GitHubRepository> for Repository {
    type Error = ForgeError;

    fn try_from(gh: GitHubRepository) -> Result<Self, Self::Error> {
        let id = RepoId::new(gh.owner.login, gh.name)
            .map_err(|e| ForgeError::InvalidResponse(e.to_string()))?;
        let default_branch = gh
            .default_branch
            .map(BranchName::new)
            .transpose()
            .map_err(|e| ForgeError::InvalidResponse(e.to_string()))?;
        Ok(Repository {
            id,
            default_branch,
            url: gh.html_url,
            is_fork: gh.fork,
        })
    }
}

/// GitHub git ref response format.
#[derive(Deserialize)]
struct GitHubGitRef {
    #[serde(rename = "ref")]
    ref_name: String,
    object: GitHubObject,
}

/// The object a ref points at.
#[derive(Deserialize)]
struct GitHubObject {
    sha: String,
}

impl TryFrom<GitHubGitRef> for GitRef {
    type Error = ForgeError;

    fn try_from(gh: GitHubGitRef) -> Result<Self, Self::Error> {
        Ok(GitRef {
            name: RefName::new(gh.ref_name)
                .map_err(|e| ForgeError::InvalidResponse(e.to_string()))?,
            sha: Oid::new(gh.object.sha).map_err(|e| ForgeError::InvalidResponse(e.to_string()))?,
        })
    }
}

/// GitHub contents response format (single file).
#[derive(Deserialize)]
struct GitHubContent {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl TryFrom<GitHubContent> for FileContent {
    type Error = ForgeError;

    fn try_from(gh: GitHubContent) -> Result<Self, Self::Error> {
        if gh.kind != "file" {
            return Err(ForgeError::InvalidResponse(format!(
                "'{}' is a {}, not a file",
                gh.path, gh.kind
            )));
        }
        let content = match (gh.encoding.as_deref(), gh.content) {
            (Some("base64"), Some(encoded)) => decode_content(&encoded)?,
            (None, Some(raw)) | (Some(""), Some(raw)) => raw.into_bytes(),
            (Some(other), Some(_)) => {
                return Err(ForgeError::InvalidResponse(format!(
                    "unsupported content encoding '{}'",
                    other
                )))
            }
            (_, None) => Vec::new(),
        };
        Ok(FileContent {
            path: gh.path,
            sha: gh.sha,
            content,
        })
    }
}

/// Decode base64 file content. GitHub wraps the encoding at 60 columns.
fn decode_content(encoded: &str) -> Result<Vec<u8>, ForgeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(compact)
        .map_err(|e| ForgeError::InvalidResponse(format!("invalid base64 content: {}", e)))
}

/// GitHub contents write response format.
#[derive(Deserialize)]
struct GitHubContentUpdate {
    content: GitHubContentRef,
    commit: GitHubCommit,
}

#[derive(Deserialize)]
struct GitHubContentRef {
    path: String,
    sha: String,
}

#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    #[serde(default)]
    message: String,
}

impl TryFrom<GitHubContentUpdate> for ContentUpdate {
    type Error = ForgeError;

    fn try_from(gh: GitHubContentUpdate) -> Result<Self, Self::Error> {
        Ok(ContentUpdate {
            content: ContentRef {
                path: gh.content.path,
                sha: gh.content.sha,
            },
            commit: CommitRef {
                sha: Oid::new(gh.commit.sha)
                    .map_err(|e| ForgeError::InvalidResponse(e.to_string()))?,
                message: gh.commit.message,
            },
        })
    }
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    state: String,
    #[serde(default)]
    draft: bool,
    head: GitHubPrRef,
    base: GitHubPrRef,
    title: String,
    body: Option<String>,
    merged: Option<bool>,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubPrRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        let state = if pr.merged.unwrap_or(false) {
            PrState::Merged
        } else if pr.state == "closed" {
            PrState::Closed
        } else {
            PrState::Open
        };

        PullRequest {
            number: pr.number,
            url: pr.html_url,
            state,
            is_draft: pr.draft,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
            title: pr.title,
            body: pr.body,
        }
    }
}
