//! fork
//!
//! Fork workflow: ensure a fork of an upstream repository exists, create or
//! sync branches in it from upstream branches, and hand out
//! [`ForkedBranch`] handles for committing files and opening pull requests.
//!
//! # Design
//!
//! [`ForkManager`] owns one upstream/fork relationship. It is built from an
//! [`UpstreamSource`] and an injected `Arc<dyn Forge>`; there is no global
//! client. All operations are sequences of awaited forge calls with no
//! retries and no caching.
//!
//! Branch creation falls back to synchronization explicitly: the create
//! result is matched and only [`ForkError::BranchExists`] leads to
//! [`BranchSynchronizer::sync`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use forksync::core::types::BranchName;
//! use forksync::forge::github::GitHubForge;
//! use forksync::fork::{ForkManager, UpstreamSource};
//!
//! let forge = Arc::new(GitHubForge::with_default_api(token));
//! let source = UpstreamSource::FullName("octocat/hello-world".into());
//! let manager = ForkManager::new(forge, source).await?;
//!
//! let main = BranchName::new("main")?;
//! let feature = BranchName::new("docs-fix")?;
//! let branch = manager
//!     .create_or_sync_branch_from_upstream(&main, &feature, false)
//!     .await?;
//! branch.update_content("README.md", "Fix typo", "...").await?;
//! let pr = branch.create_pull("Fix typo", None).await?;
//! ```

mod branch;
mod error;
pub mod sync;

pub use branch::ForkedBranch;
pub use error::{ForkError, SyncFailure};
pub use sync::{BranchSynchronizer, SyncOutcome};

use std::sync::Arc;

use tracing::{info, instrument};

use crate::core::types::{BranchName, Oid, RefName, RepoId};
use crate::forge::{Forge, ForgeError, Repository};

/// How the upstream repository is identified.
#[derive(Debug, Clone)]
pub enum UpstreamSource {
    /// An already resolved repository. No lookup is made.
    Repository(Repository),
    /// `owner/name`.
    FullName(String),
    /// A web URL; the last two path segments are owner and name, verbatim.
    Url(String),
}

impl UpstreamSource {
    /// Pick the single source among optional inputs.
    ///
    /// # Errors
    ///
    /// `Configuration` if none or more than one is given.
    pub fn from_parts(
        repository: Option<Repository>,
        full_name: Option<String>,
        url: Option<String>,
    ) -> Result<Self, ForkError> {
        match (repository, full_name, url) {
            (Some(repo), None, None) => Ok(UpstreamSource::Repository(repo)),
            (None, Some(name), None) => Ok(UpstreamSource::FullName(name)),
            (None, None, Some(url)) => Ok(UpstreamSource::Url(url)),
            (None, None, None) => Err(ForkError::Configuration(
                "an upstream repository, full name or URL is required".into(),
            )),
            _ => Err(ForkError::Configuration(
                "give only one of upstream repository, full name or URL".into(),
            )),
        }
    }
}

/// Snapshot of a branch tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub repo: RepoId,
    pub name: BranchName,
    pub head: Oid,
}

/// One upstream repository and the caller's fork of it.
pub struct ForkManager {
    forge: Arc<dyn Forge>,
    upstream: Repository,
    fork: Repository,
    fork_owner: String,
}

impl std::fmt::Debug for ForkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkManager")
            .field("forge", &self.forge.name())
            .field("upstream", &self.upstream.id)
            .field("fork", &self.fork.id)
            .finish()
    }
}

impl ForkManager {
    /// Resolve the upstream repository and make sure a fork of it exists.
    ///
    /// Forking is idempotent on the hosting side, so an existing fork is
    /// reused.
    ///
    /// # Errors
    ///
    /// - `Configuration` if a full name or URL does not name a repository
    /// - `NotFound` if the upstream repository doesn't exist
    #[instrument(skip(forge))]
    pub async fn new(forge: Arc<dyn Forge>, source: UpstreamSource) -> Result<Self, ForkError> {
        let upstream = match source {
            UpstreamSource::Repository(repo) => repo,
            UpstreamSource::FullName(name) => {
                forge.get_repo(&RepoId::parse_full_name(&name)?).await?
            }
            UpstreamSource::Url(url) => forge.get_repo(&RepoId::from_url(&url)?).await?,
        };

        let fork = forge.create_fork(&upstream.id).await?;
        let fork_owner = fork.owner().to_string();
        info!(upstream = %upstream.id, fork = %fork.id, "fork ready");

        Ok(Self {
            forge,
            upstream,
            fork,
            fork_owner,
        })
    }

    /// The fork.
    pub fn fork(&self) -> &Repository {
        &self.fork
    }

    /// The upstream repository.
    pub fn upstream(&self) -> &Repository {
        &self.upstream
    }

    /// Login owning the fork.
    pub fn fork_owner(&self) -> &str {
        &self.fork_owner
    }

    /// Create `downstream_branch` in the fork at the tip of `upstream_branch`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the upstream branch doesn't exist
    /// - `BranchExists` if the fork already has `downstream_branch`
    #[instrument(skip(self), fields(upstream = %self.upstream.id, fork = %self.fork.id))]
    pub async fn create_branch_from_upstream(
        &self,
        upstream_branch: &BranchName,
        downstream_branch: &BranchName,
    ) -> Result<ForkedBranch, ForkError> {
        let tip = self
            .forge
            .get_ref(&self.upstream.id, &RefName::for_branch(upstream_branch))
            .await
            .map_err(|err| match err {
                ForgeError::NotFound(_) => ForkError::NotFound(format!(
                    "upstream branch '{}' in {}",
                    upstream_branch, self.upstream.id
                )),
                other => ForkError::Hosting(other),
            })?;

        match self
            .forge
            .create_ref(&self.fork.id, &RefName::for_branch(downstream_branch), &tip.sha)
            .await
        {
            Ok(_) => {
                info!(branch = %downstream_branch, sha = %tip.sha.short(7), "created fork branch");
                Ok(self.branch(upstream_branch, downstream_branch))
            }
            Err(err) if err.is_conflict() => Err(ForkError::BranchExists {
                repo: self.fork.id.clone(),
                branch: downstream_branch.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Create `downstream_branch` from `upstream_branch`, or sync it if it
    /// already exists.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the upstream branch doesn't exist
    /// - `Sync` if the existing branch cannot be moved to the upstream tip
    pub async fn create_or_sync_branch_from_upstream(
        &self,
        upstream_branch: &BranchName,
        downstream_branch: &BranchName,
        force: bool,
    ) -> Result<ForkedBranch, ForkError> {
        match self
            .create_branch_from_upstream(upstream_branch, downstream_branch)
            .await
        {
            Ok(branch) => Ok(branch),
            Err(ForkError::BranchExists { .. }) => {
                self.sync_branch(upstream_branch, downstream_branch, force)
                    .await?;
                Ok(self.branch(upstream_branch, downstream_branch))
            }
            Err(err) => Err(err),
        }
    }

    /// Move an existing fork branch to the tip of `upstream_branch`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either branch doesn't exist
    /// - `Sync` if the fork branch cannot be moved, e.g. it has diverged and
    ///   `force` is off
    /// - `Hosting` if reading either tip fails for another reason
    pub async fn sync_branch(
        &self,
        upstream_branch: &BranchName,
        downstream_branch: &BranchName,
        force: bool,
    ) -> Result<SyncOutcome, ForkError> {
        BranchSynchronizer::new(self.forge.as_ref(), &self.upstream.id, &self.fork.id)
            .sync(upstream_branch, downstream_branch, force)
            .await
    }

    /// Handle for an existing fork branch. Makes no forge call.
    pub fn branch(&self, upstream_branch: &BranchName, downstream_branch: &BranchName) -> ForkedBranch {
        ForkedBranch::new(
            Arc::clone(&self.forge),
            self.fork.id.clone(),
            downstream_branch.clone(),
            self.upstream.id.clone(),
            upstream_branch.clone(),
            self.fork_owner.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};

    fn upstream_id() -> RepoId {
        RepoId::parse_full_name("octocat/hello").unwrap()
    }

    fn seeded() -> MockForge {
        let forge = MockForge::new().authenticated_as("me");
        forge.add_repo(&upstream_id(), &BranchName::new("main").unwrap());
        forge
    }

    mod upstream_source {
        use super::*;

        #[test]
        fn exactly_one_required() {
            assert!(matches!(
                UpstreamSource::from_parts(None, None, None),
                Err(ForkError::Configuration(_))
            ));
            assert!(matches!(
                UpstreamSource::from_parts(None, Some("a/b".into()), Some("https://x/a/b".into())),
                Err(ForkError::Configuration(_))
            ));
            assert!(matches!(
                UpstreamSource::from_parts(None, Some("a/b".into()), None),
                Ok(UpstreamSource::FullName(_))
            ));
            assert!(matches!(
                UpstreamSource::from_parts(None, None, Some("https://github.com/a/b".into())),
                Ok(UpstreamSource::Url(_))
            ));
        }
    }

    mod construct {
        use super::*;

        #[tokio::test]
        async fn from_full_name() {
            let forge = seeded();
            let manager = ForkManager::new(
                Arc::new(forge.clone()),
                UpstreamSource::FullName("octocat/hello".into()),
            )
            .await
            .unwrap();

            assert_eq!(manager.upstream().id, upstream_id());
            assert_eq!(manager.fork().id.full_name(), "me/hello");
            assert_eq!(manager.fork_owner(), "me");
            assert_eq!(manager.fork_owner(), manager.fork().owner());
        }

        #[tokio::test]
        async fn from_url() {
            let forge = seeded();
            let manager = ForkManager::new(
                Arc::new(forge),
                UpstreamSource::Url("https://github.com/octocat/hello".into()),
            )
            .await
            .unwrap();
            assert_eq!(manager.upstream().id, upstream_id());
        }

        #[tokio::test]
        async fn resolved_repository_skips_lookup() {
            let forge = seeded();
            let repo = forge.get_repo(&upstream_id()).await.unwrap();
            forge.clear_operations();

            ForkManager::new(Arc::new(forge.clone()), UpstreamSource::Repository(repo))
                .await
                .unwrap();
            assert_eq!(
                forge.operations(),
                vec![MockOperation::CreateFork { repo: upstream_id() }]
            );
        }

        #[tokio::test]
        async fn bad_full_name_is_configuration() {
            let err = ForkManager::new(
                Arc::new(seeded()),
                UpstreamSource::FullName("just-a-name".into()),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ForkError::Configuration(_)));
        }

        #[tokio::test]
        async fn missing_upstream_is_not_found() {
            let err = ForkManager::new(
                Arc::new(seeded()),
                UpstreamSource::FullName("octocat/missing".into()),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ForkError::NotFound(_)));
        }
    }

    mod branches {
        use super::*;

        async fn manager(forge: &MockForge) -> ForkManager {
            ForkManager::new(
                Arc::new(forge.clone()),
                UpstreamSource::FullName("octocat/hello".into()),
            )
            .await
            .unwrap()
        }

        #[tokio::test]
        async fn missing_upstream_branch() {
            let forge = seeded();
            let manager = manager(&forge).await;
            let err = manager
                .create_branch_from_upstream(
                    &BranchName::new("nope").unwrap(),
                    &BranchName::new("feature").unwrap(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ForkError::NotFound(_)));
        }

        #[tokio::test]
        async fn create_ref_failure_is_hosting_error() {
            let forge = seeded();
            let manager = manager(&forge).await;
            forge.set_fail_on(FailOn::CreateRef(ForgeError::AuthFailed("no".into())));

            let err = manager
                .create_or_sync_branch_from_upstream(
                    &BranchName::new("main").unwrap(),
                    &BranchName::new("feature").unwrap(),
                    false,
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ForkError::Hosting(ForgeError::AuthFailed(_))));
        }

        #[tokio::test]
        async fn branch_handle_makes_no_calls() {
            let forge = seeded();
            let manager = manager(&forge).await;
            forge.clear_operations();

            let handle = manager.branch(
                &BranchName::new("main").unwrap(),
                &BranchName::new("feature").unwrap(),
            );
            assert_eq!(handle.head_descriptor(), "me:feature");
            assert_eq!(handle.upstream_branch().as_str(), "main");
            assert!(forge.operations().is_empty());
        }
    }
}
