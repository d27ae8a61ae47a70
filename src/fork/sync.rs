//! fork::sync
//!
//! Bring a fork branch to the tip of an upstream branch.
//!
//! # Algorithm
//!
//! 1. Read the downstream tip `D` and the upstream tip `U`.
//! 2. If `D == U` nothing is written.
//! 3. Otherwise the downstream ref is moved to `U`, passing `force` through.
//!    Without `force` the hosting service only accepts a fast-forward.
//!
//! Any failure of the ref update is a [`ForkError::Sync`]; it never reports
//! success. A missing branch on either side is [`ForkError::NotFound`].

use tracing::{debug, info, instrument};

use super::error::{ForkError, SyncFailure};
use crate::core::types::{BranchName, Oid, RefName, RepoId};
use crate::forge::{Forge, ForgeError};

/// Result of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The branches already pointed at the same commit.
    AlreadyInSync { head: Oid },
    /// The downstream ref was moved.
    Updated { from: Oid, to: Oid, forced: bool },
}

impl SyncOutcome {
    /// Tip of the downstream branch after the sync.
    pub fn head(&self) -> &Oid {
        match self {
            SyncOutcome::AlreadyInSync { head } => head,
            SyncOutcome::Updated { to, .. } => to,
        }
    }

    /// Whether the downstream ref moved.
    pub fn changed(&self) -> bool {
        matches!(self, SyncOutcome::Updated { .. })
    }
}

/// Compares and reconciles one upstream/fork repository pair.
pub struct BranchSynchronizer<'a> {
    forge: &'a dyn Forge,
    upstream: &'a RepoId,
    fork: &'a RepoId,
}

impl<'a> BranchSynchronizer<'a> {
    pub fn new(forge: &'a dyn Forge, upstream: &'a RepoId, fork: &'a RepoId) -> Self {
        Self {
            forge,
            upstream,
            fork,
        }
    }

    /// Move `downstream_branch` in the fork to the tip of `upstream_branch`.
    #[instrument(skip(self), fields(upstream = %self.upstream, fork = %self.fork))]
    pub async fn sync(
        &self,
        upstream_branch: &BranchName,
        downstream_branch: &BranchName,
        force: bool,
    ) -> Result<SyncOutcome, ForkError> {
        let downstream_ref = RefName::for_branch(downstream_branch);
        let downstream = self
            .tip(self.fork, &downstream_ref, "fork branch", downstream_branch)
            .await?;
        let upstream = self
            .tip(
                self.upstream,
                &RefName::for_branch(upstream_branch),
                "upstream branch",
                upstream_branch,
            )
            .await?;

        if downstream == upstream {
            debug!(head = %downstream.short(7), "already in sync");
            return Ok(SyncOutcome::AlreadyInSync { head: downstream });
        }

        match self
            .forge
            .update_ref(self.fork, &downstream_ref, &upstream, force)
            .await
        {
            Ok(_) => {
                info!(
                    from = %downstream.short(7),
                    to = %upstream.short(7),
                    force,
                    "moved fork branch"
                );
                Ok(SyncOutcome::Updated {
                    from: downstream,
                    to: upstream,
                    forced: force,
                })
            }
            Err(err) => {
                let reason = match err {
                    ForgeError::Unprocessable { .. } if !force && err.mentions("fast forward") => {
                        SyncFailure::NotFastForward {
                            downstream,
                            upstream,
                        }
                    }
                    other => SyncFailure::Rejected(other),
                };
                debug!(%reason, "sync failed");
                Err(ForkError::Sync {
                    branch: downstream_branch.clone(),
                    reason,
                })
            }
        }
    }

    async fn tip(
        &self,
        repo: &RepoId,
        name: &RefName,
        what: &str,
        branch: &BranchName,
    ) -> Result<Oid, ForkError> {
        match self.forge.get_ref(repo, name).await {
            Ok(git_ref) => Ok(git_ref.sha),
            Err(ForgeError::NotFound(_)) => Err(ForkError::NotFound(format!(
                "{} '{}' in {}",
                what, branch, repo
            ))),
            Err(err) => Err(ForkError::Hosting(err)),
        }
    }
}
