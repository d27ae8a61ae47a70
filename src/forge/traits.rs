//! forge::traits
//!
//! Forge trait definition for interacting with the hosting service.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! It is the whole contract the fork workflow needs from the hosting
//! service: repository lookup, fork creation, ref read/create/update, file
//! contents read/write, and pull request creation.
//!
//! Every method is addressed by an explicit [`RepoId`] so one client serves
//! both the upstream repository and its fork.
//!
//! Failures are reported as a tagged [`ForgeError`]. Callers dispatch on the
//! tag (`NotFound`, `Unprocessable`, `Conflict`, ...) rather than inspecting
//! a status field.
//!
//! # Example
//!
//! ```ignore
//! use forksync::core::types::{BranchName, RefName, RepoId};
//! use forksync::forge::{Forge, ForgeError};
//!
//! async fn tip(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     let repo = RepoId::parse_full_name("octocat/hello-world").unwrap();
//!     let main = RefName::for_branch(&BranchName::new("main").unwrap());
//!     let git_ref = forge.get_ref(&repo, &main).await?;
//!     println!("main is at {}", git_ref.sha);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{BranchName, Oid, RefName, RepoId};

/// Errors from forge operations.
///
/// These map the hosting service's failure responses onto tags the fork
/// workflow dispatches on.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was well formed but rejected (422). This is the class
    /// GitHub uses for "reference already exists", "not a fast forward",
    /// "no commits between" and similar.
    #[error("unprocessable: {message}{}", format_details(.details))]
    Unprocessable {
        /// Top-level error message
        message: String,
        /// Per-field detail messages, if any
        details: Vec<String>,
    },

    /// The write conflicts with the current state of the resource (409),
    /// e.g. a stale file sha.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error not covered by another variant.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A success response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn format_details(details: &[String]) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(" ({})", details.join("; "))
    }
}

impl ForgeError {
    /// HTTP status this error corresponds to, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ForgeError::AuthFailed(_) => Some(401),
            ForgeError::NotFound(_) => Some(404),
            ForgeError::Conflict(_) => Some(409),
            ForgeError::Unprocessable { .. } => Some(422),
            ForgeError::RateLimited => Some(429),
            ForgeError::ApiError { status, .. } => Some(*status),
            ForgeError::AuthRequired
            | ForgeError::NetworkError(_)
            | ForgeError::InvalidResponse(_) => None,
        }
    }

    /// Check if this is the hosting service's conflict class: the write was
    /// well formed but clashes with existing state (422 or 409).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ForgeError::Unprocessable { .. } | ForgeError::Conflict(_)
        )
    }

    /// Check if any message attached to this error contains `needle`
    /// (case-insensitive).
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        let matches = |s: &str| s.to_ascii_lowercase().contains(&needle);
        match self {
            ForgeError::Unprocessable { message, details } => {
                matches(message) || details.iter().any(|d| matches(d))
            }
            ForgeError::AuthFailed(m)
            | ForgeError::NotFound(m)
            | ForgeError::Conflict(m)
            | ForgeError::NetworkError(m)
            | ForgeError::InvalidResponse(m)
            | ForgeError::ApiError { message: m, .. } => matches(m),
            ForgeError::AuthRequired | ForgeError::RateLimited => false,
        }
    }
}

/// A repository as reported by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Owner and name
    pub id: RepoId,
    /// Default branch, if the repository has any commits
    pub default_branch: Option<BranchName>,
    /// Web URL
    pub url: String,
    /// Whether this repository is itself a fork
    pub is_fork: bool,
}

impl Repository {
    /// Login of the user or organization owning the repository.
    pub fn owner(&self) -> &str {
        self.id.owner()
    }
}

/// A ref and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    /// Fully qualified name (`refs/heads/...`)
    pub name: RefName,
    /// Tip commit
    pub sha: Oid,
}

/// A file read from a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Path within the repository
    pub path: String,
    /// Change-identifier token (blob sha) required to update the file
    pub sha: String,
    /// Decoded file bytes
    pub content: Vec<u8>,
}

/// Request to create or update a file on a branch.
///
/// A request without `sha` creates the file; with `sha` it updates the file
/// observed at that token.
#[derive(Debug, Clone)]
pub struct PutContentsRequest {
    /// Path within the repository
    pub path: String,
    /// Commit message
    pub message: String,
    /// New file bytes
    pub content: Vec<u8>,
    /// Branch to commit to
    pub branch: BranchName,
    /// Token of the file being replaced (update only)
    pub sha: Option<String>,
}

/// File half of a contents write result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    /// Path within the repository
    pub path: String,
    /// New change-identifier token
    pub sha: String,
}

/// Commit half of a contents write result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    /// The commit created by the write
    pub sha: Oid,
    /// Its message
    pub message: String,
}

/// Result of a file create or update: the new file state and the commit
/// that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    pub content: ContentRef,
    pub commit: CommitRef,
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Head descriptor; `owner:branch` for cross-fork pull requests
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
    /// Create as draft
    pub draft: bool,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// PR state (open, closed, merged)
    pub state: PrState,
    /// Whether the PR is a draft
    pub is_draft: bool,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body
    pub body: Option<String>,
}

/// PR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    /// PR is open and awaiting review/merge
    Open,
    /// PR is closed without being merged
    Closed,
    /// PR has been merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// The Forge trait for interacting with the hosting service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one client can be shared by a
/// fork manager and the branch handles it hands out.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Implementations never retry;
/// every failure reaches the caller.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Look up a repository.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository doesn't exist or isn't visible
    async fn get_repo(&self, repo: &RepoId) -> Result<Repository, ForgeError>;

    /// Fork a repository into the authenticated account.
    ///
    /// Idempotent: forking a repository that is already forked returns the
    /// existing fork.
    async fn create_fork(&self, repo: &RepoId) -> Result<Repository, ForgeError>;

    /// Read a ref.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ref doesn't exist
    async fn get_ref(&self, repo: &RepoId, name: &RefName) -> Result<GitRef, ForgeError>;

    /// Create a ref pointing at `sha`.
    ///
    /// # Errors
    ///
    /// - `Unprocessable` if the ref already exists
    async fn create_ref(
        &self,
        repo: &RepoId,
        name: &RefName,
        sha: &Oid,
    ) -> Result<GitRef, ForgeError>;

    /// Move a ref to `sha`.
    ///
    /// With `force == false` only fast-forward moves are accepted.
    ///
    /// # Errors
    ///
    /// - `Unprocessable` if the move is not a fast-forward and `force` is false,
    ///   or if the ref doesn't exist
    async fn update_ref(
        &self,
        repo: &RepoId,
        name: &RefName,
        sha: &Oid,
        force: bool,
    ) -> Result<GitRef, ForgeError>;

    /// Read a file on a branch.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file or branch doesn't exist
    async fn get_contents(
        &self,
        repo: &RepoId,
        path: &str,
        branch: &BranchName,
    ) -> Result<FileContent, ForgeError>;

    /// Create or update a file on a branch, committing the change.
    ///
    /// # Errors
    ///
    /// - `Unprocessable` when creating a file that already exists
    /// - `Conflict` when updating with a stale `sha`
    async fn put_contents(
        &self,
        repo: &RepoId,
        request: PutContentsRequest,
    ) -> Result<ContentUpdate, ForgeError>;

    /// Create a pull request on `repo`.
    ///
    /// # Errors
    ///
    /// - `Unprocessable` if an equivalent PR is already open or the branches
    ///   have no commits between them
    async fn create_pr(
        &self,
        repo: &RepoId,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_state_display() {
        assert_eq!(format!("{}", PrState::Open), "open");
        assert_eq!(format!("{}", PrState::Closed), "closed");
        assert_eq!(format!("{}", PrState::Merged), "merged");
    }

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthRequired),
            "authentication required"
        );
        assert_eq!(
            format!("{}", ForgeError::NotFound("heads/main".into())),
            "not found: heads/main"
        );
        assert_eq!(
            format!(
                "{}",
                ForgeError::Unprocessable {
                    message: "Validation Failed".into(),
                    details: vec![],
                }
            ),
            "unprocessable: Validation Failed"
        );
        assert_eq!(
            format!(
                "{}",
                ForgeError::Unprocessable {
                    message: "Validation Failed".into(),
                    details: vec!["a".into(), "b".into()],
                }
            ),
            "unprocessable: Validation Failed (a; b)"
        );
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 500,
                    message: "boom".into()
                }
            ),
            "API error: 500 - boom"
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(ForgeError::NotFound(String::new()).status(), Some(404));
        assert_eq!(ForgeError::Conflict(String::new()).status(), Some(409));
        assert_eq!(
            ForgeError::Unprocessable {
                message: String::new(),
                details: vec![]
            }
            .status(),
            Some(422)
        );
        assert_eq!(
            ForgeError::ApiError {
                status: 502,
                message: String::new()
            }
            .status(),
            Some(502)
        );
        assert_eq!(ForgeError::NetworkError(String::new()).status(), None);
    }

    #[test]
    fn conflict_class() {
        assert!(ForgeError::Conflict("sha mismatch".into()).is_conflict());
        assert!(ForgeError::Unprocessable {
            message: "Reference already exists".into(),
            details: vec![],
        }
        .is_conflict());
        assert!(!ForgeError::NotFound("x".into()).is_conflict());
        assert!(!ForgeError::ApiError {
            status: 500,
            message: "x".into()
        }
        .is_conflict());
    }

    #[test]
    fn mentions_searches_details() {
        let err = ForgeError::Unprocessable {
            message: "Validation Failed".into(),
            details: vec!["A pull request already exists for octocat:feature.".into()],
        };
        assert!(err.mentions("already exists"));
        assert!(err.mentions("VALIDATION"));
        assert!(!err.mentions("no commits between"));
        assert!(!ForgeError::RateLimited.mentions("rate"));
    }
}
