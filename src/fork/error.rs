//! fork::error
//!
//! Errors surfaced by the fork workflow.
//!
//! Forge failures are classified into workflow kinds at the call site that
//! knows what the failure means (a 422 on ref creation is an existing
//! branch, a 422 on a pull request is a validation failure, ...). Anything
//! not classified ends up in [`ForkError::Hosting`].

use thiserror::Error;

use crate::core::types::{BranchName, Oid, RepoId, TypeError};
use crate::forge::ForgeError;

/// Errors from fork workflow operations.
#[derive(Debug, Error)]
pub enum ForkError {
    /// Missing or malformed input (upstream source, names, token).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A repository, branch or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The downstream branch already exists in the fork.
    #[error("branch '{branch}' already exists in {repo}")]
    BranchExists { repo: RepoId, branch: BranchName },

    /// A write clashed with existing state (file exists, stale token,
    /// duplicate pull request).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The fork branch could not be brought to the upstream tip.
    #[error("failed to sync branch '{branch}': {reason}")]
    Sync {
        branch: BranchName,
        #[source]
        reason: SyncFailure,
    },

    /// The hosting service rejected the request as invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Any other hosting service failure.
    #[error("hosting service error: {0}")]
    Hosting(#[source] ForgeError),
}

/// Why a sync could not move the fork branch.
#[derive(Debug, Error)]
pub enum SyncFailure {
    /// The fork branch has commits the upstream tip doesn't contain.
    #[error("{downstream} is not an ancestor of {upstream}; pass force to overwrite")]
    NotFastForward { downstream: Oid, upstream: Oid },

    /// The ref update failed for another reason.
    #[error("ref update rejected: {0}")]
    Rejected(#[source] ForgeError),
}

impl From<ForgeError> for ForkError {
    fn from(err: ForgeError) -> Self {
        match err {
            ForgeError::NotFound(what) => ForkError::NotFound(what),
            other => ForkError::Hosting(other),
        }
    }
}

impl From<TypeError> for ForkError {
    fn from(err: TypeError) -> Self {
        ForkError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forge_not_found_classified() {
        let err: ForkError = ForgeError::NotFound("heads/main".into()).into();
        assert!(matches!(err, ForkError::NotFound(_)));

        let err: ForkError = ForgeError::RateLimited.into();
        assert!(matches!(err, ForkError::Hosting(ForgeError::RateLimited)));
    }

    #[test]
    fn type_errors_are_configuration() {
        let err: ForkError = BranchName::new("bad..name").unwrap_err().into();
        assert!(matches!(err, ForkError::Configuration(_)));
    }

    #[test]
    fn sync_error_display() {
        let err = ForkError::Sync {
            branch: BranchName::new("feature").unwrap(),
            reason: SyncFailure::NotFastForward {
                downstream: Oid::new("a".repeat(40)).unwrap(),
                upstream: Oid::new("b".repeat(40)).unwrap(),
            },
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to sync branch 'feature'"));
        assert!(message.contains("not an ancestor"));
    }
}
