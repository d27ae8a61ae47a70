//! Integration tests for the fork workflow.
//!
//! These tests drive `ForkManager` and `ForkedBranch` end to end against
//! `MockForge`, which models refs, commits and file contents in memory.

use std::sync::Arc;

use forksync::core::types::{BranchName, RepoId};
use forksync::forge::mock::{FailOn, MockForge, MockOperation};
use forksync::forge::{Forge, ForgeError};
use forksync::fork::{ForkError, ForkManager, SyncFailure, SyncOutcome, UpstreamSource};

fn repo(full_name: &str) -> RepoId {
    RepoId::parse_full_name(full_name).unwrap()
}

fn branch(name: &str) -> BranchName {
    BranchName::new(name).unwrap()
}

/// Upstream `octocat/hello` with `main`, forked by `me`.
async fn setup() -> (MockForge, ForkManager) {
    let forge = MockForge::new().authenticated_as("me");
    forge.add_repo(&repo("octocat/hello"), &branch("main"));
    let manager = ForkManager::new(
        Arc::new(forge.clone()),
        UpstreamSource::FullName("octocat/hello".into()),
    )
    .await
    .unwrap();
    (forge, manager)
}

// =============================================================================
// Construction
// =============================================================================

mod construct {
    use super::*;

    #[tokio::test]
    async fn forks_under_caller() {
        let (forge, manager) = setup().await;
        assert_eq!(manager.fork().id, repo("me/hello"));
        assert_eq!(manager.fork_owner(), "me");
        assert!(manager.fork().is_fork);
        assert!(forge.has_repo(&repo("me/hello")));
    }

    #[tokio::test]
    async fn url_source_uses_last_two_segments() {
        let forge = MockForge::new().authenticated_as("me");
        forge.add_repo(&repo("octocat/hello"), &branch("main"));

        let manager = ForkManager::new(
            Arc::new(forge.clone()),
            UpstreamSource::Url("https://github.com/octocat/hello".into()),
        )
        .await
        .unwrap();
        assert_eq!(manager.upstream().id, repo("octocat/hello"));
    }

    #[tokio::test]
    async fn resolved_repository_skips_lookup() {
        let forge = MockForge::new().authenticated_as("me");
        forge.add_repo(&repo("octocat/hello"), &branch("main"));
        let upstream = forge.get_repo(&repo("octocat/hello")).await.unwrap();
        forge.clear_operations();

        ForkManager::new(Arc::new(forge.clone()), UpstreamSource::Repository(upstream))
            .await
            .unwrap();

        assert!(!forge
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::GetRepo { .. })));
    }

    #[tokio::test]
    async fn existing_fork_is_reused() {
        let (forge, first) = setup().await;
        let second = ForkManager::new(
            Arc::new(forge.clone()),
            UpstreamSource::FullName("octocat/hello".into()),
        )
        .await
        .unwrap();
        assert_eq!(first.fork().id, second.fork().id);
    }

    #[tokio::test]
    async fn missing_upstream_is_not_found() {
        let forge = MockForge::new();
        let err = ForkManager::new(
            Arc::new(forge),
            UpstreamSource::FullName("octocat/missing".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ForkError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_name_is_configuration() {
        let forge = MockForge::new();
        let err = ForkManager::new(Arc::new(forge.clone()), UpstreamSource::FullName("hello".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ForkError::Configuration(_)));
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn fork_failure_is_hosting_error() {
        let forge = MockForge::new().fail_on(FailOn::CreateFork(ForgeError::AuthFailed(
            "token lacks repo scope".into(),
        )));
        forge.add_repo(&repo("octocat/hello"), &branch("main"));

        let err = ForkManager::new(
            Arc::new(forge),
            UpstreamSource::FullName("octocat/hello".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ForkError::Hosting(ForgeError::AuthFailed(_))));
    }
}

// =============================================================================
// Branch creation and sync
// =============================================================================

mod branches {
    use super::*;

    #[tokio::test]
    async fn main_feature_scenario() {
        let (forge, manager) = setup().await;
        let fork = manager.fork().id.clone();
        let upstream_tip = forge.branch_head(&repo("octocat/hello"), &branch("main")).unwrap();

        let handle = manager
            .create_branch_from_upstream(&branch("main"), &branch("feature"))
            .await
            .unwrap();
        assert_eq!(handle.branch(), &branch("feature"));
        assert_eq!(forge.branch_head(&fork, &branch("feature")).unwrap(), upstream_tip);

        let err = manager
            .create_branch_from_upstream(&branch("main"), &branch("feature"))
            .await
            .unwrap_err();
        assert!(matches!(err, ForkError::BranchExists { .. }));

        let handle = manager
            .create_or_sync_branch_from_upstream(&branch("main"), &branch("feature"), false)
            .await
            .unwrap();
        assert_eq!(handle.head().await.unwrap().head, upstream_tip);
    }

    #[tokio::test]
    async fn missing_upstream_branch_is_not_found() {
        let (_forge, manager) = setup().await;
        let err = manager
            .create_or_sync_branch_from_upstream(&branch("nope"), &branch("feature"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ForkError::NotFound(_)));
    }

    #[tokio::test]
    async fn fast_forward_sync() {
        let (forge, manager) = setup().await;
        let upstream = repo("octocat/hello");
        let fork = manager.fork().id.clone();
        manager
            .create_branch_from_upstream(&branch("main"), &branch("feature"))
            .await
            .unwrap();

        let new_tip = forge.commit_file(&upstream, &branch("main"), "CHANGELOG.md", "v2");
        let outcome = manager
            .sync_branch(&branch("main"), &branch("feature"), false)
            .await
            .unwrap();

        assert!(outcome.changed());
        assert_eq!(outcome.head(), &new_tip);
        assert_eq!(forge.branch_head(&fork, &branch("feature")).unwrap(), new_tip);
    }

    #[tokio::test]
    async fn in_sync_makes_no_write() {
        let (forge, manager) = setup().await;
        manager
            .create_branch_from_upstream(&branch("main"), &branch("feature"))
            .await
            .unwrap();
        forge.clear_operations();

        let outcome = manager
            .sync_branch(&branch("main"), &branch("feature"), true)
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::AlreadyInSync { .. }));
        assert!(!forge.operations().iter().any(MockOperation::is_write));
    }

    #[tokio::test]
    async fn diverged_fails_then_force_succeeds() {
        let (forge, manager) = setup().await;
        let upstream = repo("octocat/hello");
        let fork = manager.fork().id.clone();
        manager
            .create_branch_from_upstream(&branch("main"), &branch("feature"))
            .await
            .unwrap();

        let fork_tip = forge.commit_file(&fork, &branch("feature"), "local.txt", "mine");
        let upstream_tip = forge.commit_file(&upstream, &branch("main"), "remote.txt", "theirs");

        let err = manager
            .create_or_sync_branch_from_upstream(&branch("main"), &branch("feature"), false)
            .await
            .unwrap_err();
        match err {
            ForkError::Sync {
                branch: failed,
                reason: SyncFailure::NotFastForward { .. },
            } => assert_eq!(failed, branch("feature")),
            other => panic!("expected NotFastForward, got {:?}", other),
        }
        assert_eq!(forge.branch_head(&fork, &branch("feature")).unwrap(), fork_tip);

        manager
            .create_or_sync_branch_from_upstream(&branch("main"), &branch("feature"), true)
            .await
            .unwrap();
        assert_eq!(forge.branch_head(&fork, &branch("feature")).unwrap(), upstream_tip);
        assert!(forge.file_at(&fork, &branch("feature"), "local.txt").is_none());
    }

    #[tokio::test]
    async fn create_or_sync_is_idempotent() {
        let (forge, manager) = setup().await;
        let fork = manager.fork().id.clone();

        for _ in 0..3 {
            manager
                .create_or_sync_branch_from_upstream(&branch("main"), &branch("feature"), false)
                .await
                .unwrap();
        }

        let upstream_tip = forge.branch_head(&repo("octocat/hello"), &branch("main")).unwrap();
        assert_eq!(forge.branch_head(&fork, &branch("feature")).unwrap(), upstream_tip);
        let updates = forge
            .operations()
            .into_iter()
            .filter(|op| matches!(op, MockOperation::UpdateRef { .. }))
            .count();
        assert_eq!(updates, 0);
    }

    #[tokio::test]
    async fn rejected_update_is_sync_error() {
        let (forge, manager) = setup().await;
        manager
            .create_branch_from_upstream(&branch("main"), &branch("feature"))
            .await
            .unwrap();
        forge.commit_file(&repo("octocat/hello"), &branch("main"), "b.txt", "b");
        forge.set_fail_on(FailOn::UpdateRef(ForgeError::Unprocessable {
            message: "Protected branch update failed".into(),
            details: Vec::new(),
        }));

        let err = manager
            .sync_branch(&branch("main"), &branch("feature"), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ForkError::Sync {
                reason: SyncFailure::Rejected(_),
                ..
            }
        ));
    }
}

// =============================================================================
// Files and pull requests
// =============================================================================

mod content {
    use super::*;

    #[tokio::test]
    async fn full_workflow_opens_pull_request() {
        let (forge, manager) = setup().await;
        let handle = manager
            .create_or_sync_branch_from_upstream(&branch("main"), &branch("docs-fix"), false)
            .await
            .unwrap();

        handle
            .create_file("docs/guide.md", "Add guide", "# Guide\n")
            .await
            .unwrap();
        handle
            .update_content("README.md", "Fix typo", "# hello\n\nfixed\n")
            .await
            .unwrap();
        let pr = handle.create_pull("Docs fixes", Some("Two changes")).await.unwrap();

        assert_eq!(pr.base, "main");
        assert_eq!(pr.url, format!("https://github.com/octocat/hello/pull/{}", pr.number));
        assert_eq!(forge.pulls(&repo("octocat/hello")).len(), 1);
        assert!(forge
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::CreatePr { head, .. } if head == "me:docs-fix")));
    }

    #[tokio::test]
    async fn stale_token_conflicts_and_keeps_concurrent_write() {
        let (forge, manager) = setup().await;
        let fork = manager.fork().id.clone();
        let handle = manager
            .create_branch_from_upstream(&branch("main"), &branch("feature"))
            .await
            .unwrap();

        forge.write_before_next_put(&fork, &branch("feature"), "README.md", "concurrent");
        let err = handle
            .update_content("README.md", "edit", "mine")
            .await
            .unwrap_err();

        assert!(matches!(err, ForkError::Conflict(_)));
        assert_eq!(
            forge.file_at(&fork, &branch("feature"), "README.md").unwrap(),
            b"concurrent"
        );
    }

    #[tokio::test]
    async fn file_written_to_fork_not_upstream() {
        let (forge, manager) = setup().await;
        let handle = manager
            .create_branch_from_upstream(&branch("main"), &branch("feature"))
            .await
            .unwrap();
        handle.create_file("new.txt", "add", "x").await.unwrap();

        assert!(forge
            .file_at(&repo("octocat/hello"), &branch("main"), "new.txt")
            .is_none());
        assert_eq!(
            forge.file_at(handle.fork(), &branch("feature"), "new.txt").unwrap(),
            b"x"
        );
    }
}
