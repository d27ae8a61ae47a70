//! fork::branch
//!
//! Handle bound to one branch in the fork.
//!
//! A [`ForkedBranch`] carries everything needed to commit files to its
//! branch and open a pull request back to the upstream branch it tracks.
//! It holds no state of its own beyond names; every call goes to the forge.

use std::sync::Arc;

use tracing::{info, instrument};

use super::error::ForkError;
use super::BranchRef;
use crate::core::types::{BranchName, RefName, RepoId};
use crate::forge::{ContentUpdate, CreatePrRequest, Forge, ForgeError, PullRequest, PutContentsRequest};

/// A branch in the fork, paired with the upstream branch it targets.
#[derive(Clone)]
pub struct ForkedBranch {
    forge: Arc<dyn Forge>,
    fork: RepoId,
    branch: BranchName,
    upstream: RepoId,
    upstream_branch: BranchName,
    owner_login: String,
}

impl std::fmt::Debug for ForkedBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkedBranch")
            .field("forge", &self.forge.name())
            .field("fork", &self.fork)
            .field("branch", &self.branch)
            .field("upstream", &self.upstream)
            .field("upstream_branch", &self.upstream_branch)
            .field("owner_login", &self.owner_login)
            .finish()
    }
}

impl ForkedBranch {
    pub(crate) fn new(
        forge: Arc<dyn Forge>,
        fork: RepoId,
        branch: BranchName,
        upstream: RepoId,
        upstream_branch: BranchName,
        owner_login: String,
    ) -> Self {
        Self {
            forge,
            fork,
            branch,
            upstream,
            upstream_branch,
            owner_login,
        }
    }

    /// The fork repository.
    pub fn fork(&self) -> &RepoId {
        &self.fork
    }

    /// The branch in the fork.
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// The upstream repository pull requests are opened against.
    pub fn upstream(&self) -> &RepoId {
        &self.upstream
    }

    /// The upstream branch pull requests merge into.
    pub fn upstream_branch(&self) -> &BranchName {
        &self.upstream_branch
    }

    /// Login owning the fork.
    pub fn owner_login(&self) -> &str {
        &self.owner_login
    }

    /// Cross-fork head descriptor, `owner:branch`.
    pub fn head_descriptor(&self) -> String {
        format!("{}:{}", self.owner_login, self.branch)
    }

    /// Read the branch's current tip.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch doesn't exist in the fork
    /// - `Hosting` for any other hosting service failure
    pub async fn head(&self) -> Result<BranchRef, ForkError> {
        let git_ref = self
            .forge
            .get_ref(&self.fork, &RefName::for_branch(&self.branch))
            .await?;
        Ok(BranchRef {
            repo: self.fork.clone(),
            name: self.branch.clone(),
            head: git_ref.sha,
        })
    }

    /// Create a new file on the branch.
    ///
    /// # Errors
    ///
    /// - `Conflict` if `path` already exists on the branch
    #[instrument(skip(self, content), fields(fork = %self.fork, branch = %self.branch))]
    pub async fn create_file(
        &self,
        path: &str,
        message: &str,
        content: impl AsRef<[u8]> + Send,
    ) -> Result<ContentUpdate, ForkError> {
        let request = PutContentsRequest {
            path: path.to_string(),
            message: message.to_string(),
            content: content.as_ref().to_vec(),
            branch: self.branch.clone(),
            sha: None,
        };

        let update = self
            .forge
            .put_contents(&self.fork, request)
            .await
            .map_err(|err| {
                if err.is_conflict() {
                    ForkError::Conflict(format!("'{}' already exists on {}", path, self.branch))
                } else {
                    err.into()
                }
            })?;

        info!(commit = %update.commit.sha.short(7), "created file");
        Ok(update)
    }

    /// Replace the contents of an existing file on the branch.
    ///
    /// Reads the file's current change token and writes against it, so a
    /// concurrent write between the two calls fails instead of being lost.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `path` doesn't exist on the branch
    /// - `Conflict` if the file changed after it was read
    #[instrument(skip(self, content), fields(fork = %self.fork, branch = %self.branch))]
    pub async fn update_content(
        &self,
        path: &str,
        message: &str,
        content: impl AsRef<[u8]> + Send,
    ) -> Result<ContentUpdate, ForkError> {
        let current = self
            .forge
            .get_contents(&self.fork, path, &self.branch)
            .await
            .map_err(|err| match err {
                ForgeError::NotFound(_) => {
                    ForkError::NotFound(format!("'{}' on {} in {}", path, self.branch, self.fork))
                }
                other => ForkError::Hosting(other),
            })?;

        let request = PutContentsRequest {
            path: path.to_string(),
            message: message.to_string(),
            content: content.as_ref().to_vec(),
            branch: self.branch.clone(),
            sha: Some(current.sha.clone()),
        };

        let update = self
            .forge
            .put_contents(&self.fork, request)
            .await
            .map_err(|err| {
                if err.is_conflict() {
                    ForkError::Conflict(format!(
                        "'{}' changed on {} since {} was read",
                        path, self.branch, current.sha
                    ))
                } else {
                    err.into()
                }
            })?;

        info!(commit = %update.commit.sha.short(7), "updated file");
        Ok(update)
    }

    /// Open a pull request from this branch into the upstream branch.
    ///
    /// # Errors
    ///
    /// - `Conflict` if an equivalent pull request is already open
    /// - `Validation` if the hosting service rejects the request, e.g. when
    ///   there are no commits between the branches
    pub async fn create_pull(&self, title: &str, body: Option<&str>) -> Result<PullRequest, ForkError> {
        self.open_pull(title, body, false).await
    }

    /// Same as [`create_pull`](Self::create_pull), opened as a draft.
    pub async fn create_draft_pull(
        &self,
        title: &str,
        body: Option<&str>,
    ) -> Result<PullRequest, ForkError> {
        self.open_pull(title, body, true).await
    }

    #[instrument(skip(self, body), fields(upstream = %self.upstream, head = %self.head_descriptor()))]
    async fn open_pull(
        &self,
        title: &str,
        body: Option<&str>,
        draft: bool,
    ) -> Result<PullRequest, ForkError> {
        let request = CreatePrRequest {
            head: self.head_descriptor(),
            base: self.upstream_branch.to_string(),
            title: title.to_string(),
            body: body.map(str::to_string),
            draft,
        };

        let pr = self
            .forge
            .create_pr(&self.upstream, request)
            .await
            .map_err(|err| match err {
                ForgeError::Conflict(message) => ForkError::Conflict(message),
                err @ ForgeError::Unprocessable { .. } if err.mentions("already exists") => {
                    ForkError::Conflict(format!(
                        "a pull request from {} into {} already exists",
                        self.head_descriptor(),
                        self.upstream_branch
                    ))
                }
                err @ ForgeError::Unprocessable { .. } => ForkError::Validation(err.to_string()),
                other => other.into(),
            })?;

        info!(number = pr.number, url = %pr.url, "opened pull request");
        Ok(pr)
    }
}
