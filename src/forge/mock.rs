//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge provides a deterministic implementation of the `Forge` trait
//! for use in tests. It keeps a small in-memory model of the hosting service:
//!
//! - a commit graph shared by all repositories (forks share history)
//! - per-repository branch refs and pull requests
//! - a file snapshot per commit, so contents reads follow the branch tip
//!
//! Ref updates enforce fast-forward unless forced, file writes require the
//! current blob sha, and pull requests are rejected when a duplicate is open
//! or the head has no commits beyond the base. Failures can be injected per
//! operation and every call is recorded.
//!
//! # Example
//!
//! ```
//! use forksync::core::types::{BranchName, RefName, RepoId};
//! use forksync::forge::mock::MockForge;
//! use forksync::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//! let upstream = RepoId::parse_full_name("octocat/hello-world").unwrap();
//! let main = BranchName::new("main").unwrap();
//! let root = forge.add_repo(&upstream, &main);
//!
//! let git_ref = forge.get_ref(&upstream, &RefName::for_branch(&main)).await.unwrap();
//! assert_eq!(git_ref.sha, root);
//!
//! let fork = forge.create_fork(&upstream).await.unwrap();
//! assert_eq!(fork.owner(), "mock-user");
//! assert!(fork.is_fork);
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::traits::{
    CommitRef, ContentRef, ContentUpdate, CreatePrRequest, FileContent, Forge, ForgeError,
    GitRef, PrState, PullRequest, PutContentsRequest, Repository,
};
use crate::core::types::{BranchName, Oid, RefName, RepoId};

/// Login of the authenticated user unless overridden.
pub const DEFAULT_LOGIN: &str = "mock-user";

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    /// Login that owns forks created through this forge.
    login: String,
    /// Commit graph, shared by every repository.
    commits: HashMap<Oid, MockCommit>,
    /// Repositories by id.
    repos: HashMap<RepoId, MockRepo>,
    /// Counter feeding commit id generation.
    next_object: u64,
    /// Next PR number to assign.
    next_pr_number: u64,
    /// Writes applied just before the next matching `put_contents`.
    pending_writes: Vec<PendingWrite>,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<Oid>,
    files: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug)]
struct MockRepo {
    info: Repository,
    /// Branch refs by fully qualified name.
    refs: BTreeMap<String, Oid>,
    pulls: Vec<MockPull>,
}

#[derive(Debug)]
struct MockPull {
    /// Head descriptor as requested (`owner:branch` or `branch`).
    head: String,
    pr: PullRequest,
}

#[derive(Debug)]
struct PendingWrite {
    repo: RepoId,
    branch: BranchName,
    path: String,
    content: Vec<u8>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail get_repo with the given error.
    GetRepo(ForgeError),
    /// Fail create_fork with the given error.
    CreateFork(ForgeError),
    /// Fail get_ref with the given error.
    GetRef(ForgeError),
    /// Fail create_ref with the given error.
    CreateRef(ForgeError),
    /// Fail update_ref with the given error.
    UpdateRef(ForgeError),
    /// Fail get_contents with the given error.
    GetContents(ForgeError),
    /// Fail put_contents with the given error.
    PutContents(ForgeError),
    /// Fail create_pr with the given error.
    CreatePr(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRepo {
        repo: RepoId,
    },
    CreateFork {
        repo: RepoId,
    },
    GetRef {
        repo: RepoId,
        name: RefName,
    },
    CreateRef {
        repo: RepoId,
        name: RefName,
        sha: Oid,
    },
    UpdateRef {
        repo: RepoId,
        name: RefName,
        sha: Oid,
        force: bool,
    },
    GetContents {
        repo: RepoId,
        path: String,
        branch: BranchName,
    },
    PutContents {
        repo: RepoId,
        path: String,
        branch: BranchName,
        sha: Option<String>,
    },
    CreatePr {
        repo: RepoId,
        head: String,
        base: String,
        title: String,
        draft: bool,
    },
}

impl MockOperation {
    /// Whether this operation mutates state on the forge.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateFork { .. }
                | MockOperation::CreateRef { .. }
                | MockOperation::UpdateRef { .. }
                | MockOperation::PutContents { .. }
                | MockOperation::CreatePr { .. }
        )
    }
}

impl MockForge {
    /// Create a new empty mock forge authenticated as [`DEFAULT_LOGIN`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                login: DEFAULT_LOGIN.to_string(),
                commits: HashMap::new(),
                repos: HashMap::new(),
                next_object: 0,
                next_pr_number: 1,
                pending_writes: Vec::new(),
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Set the login that owns forks created through this forge.
    pub fn authenticated_as(self, login: impl Into<String>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.login = login.into();
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use forksync::forge::mock::{MockForge, FailOn};
    /// use forksync::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreatePr(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Configure a failure on an already shared forge.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = Some(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    // =========================================================================
    // Seeding and inspection helpers
    // =========================================================================

    /// Create a repository with a single root commit on `default_branch`.
    ///
    /// Returns the root commit. Replaces any repository with the same id.
    pub fn add_repo(&self, repo: &RepoId, default_branch: &BranchName) -> Oid {
        let mut inner = self.inner.lock().unwrap();
        let mut files = BTreeMap::new();
        files.insert("README.md".to_string(), format!("# {}\n", repo.name()).into_bytes());
        let root = inner.new_commit(Vec::new(), files);

        let mut refs = BTreeMap::new();
        refs.insert(RefName::for_branch(default_branch).as_str().to_string(), root.clone());
        inner.repos.insert(
            repo.clone(),
            MockRepo {
                info: Repository {
                    id: repo.clone(),
                    default_branch: Some(default_branch.clone()),
                    url: format!("https://github.com/{}", repo),
                    is_fork: false,
                },
                refs,
                pulls: Vec::new(),
            },
        );
        root
    }

    /// Commit a file change on an existing branch, advancing it.
    ///
    /// # Panics
    ///
    /// Panics if the repository or branch doesn't exist.
    pub fn commit_file(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        path: &str,
        content: impl AsRef<[u8]>,
    ) -> Oid {
        let mut inner = self.inner.lock().unwrap();
        inner
            .write_file(repo, branch, path, content.as_ref().to_vec())
            .unwrap()
    }

    /// Point a branch at `sha`, creating it if needed. No ancestry checks.
    ///
    /// # Panics
    ///
    /// Panics if the repository doesn't exist.
    pub fn set_branch(&self, repo: &RepoId, branch: &BranchName, sha: &Oid) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .repos
            .get_mut(repo)
            .unwrap()
            .refs
            .insert(RefName::for_branch(branch).as_str().to_string(), sha.clone());
    }

    /// Current tip of a branch.
    pub fn branch_head(&self, repo: &RepoId, branch: &BranchName) -> Option<Oid> {
        let inner = self.inner.lock().unwrap();
        inner.head(repo, branch)
    }

    /// File bytes at the tip of a branch.
    pub fn file_at(&self, repo: &RepoId, branch: &BranchName, path: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        let head = inner.head(repo, branch)?;
        inner.commits.get(&head)?.files.get(path).cloned()
    }

    /// Whether `ancestor` is reachable from `descendant` (or equal to it).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.is_ancestor(ancestor, descendant)
    }

    /// Pull requests opened against a repository.
    pub fn pulls(&self, repo: &RepoId) -> Vec<PullRequest> {
        let inner = self.inner.lock().unwrap();
        inner
            .repos
            .get(repo)
            .map(|r| r.pulls.iter().map(|p| p.pr.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether a repository exists.
    pub fn has_repo(&self, repo: &RepoId) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.repos.contains_key(repo)
    }

    /// Simulate another writer: commit `content` to `path` on `branch`
    /// immediately before the next `put_contents` to that branch runs.
    pub fn write_before_next_put(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        path: &str,
        content: impl AsRef<[u8]>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.pending_writes.push(PendingWrite {
            repo: repo.clone(),
            branch: branch.clone(),
            path: path.to_string(),
            content: content.as_ref().to_vec(),
        });
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail<T>(&self, expected: &str) -> Option<Result<T, ForgeError>> {
        let inner = self.inner.lock().unwrap();
        match &inner.fail_on {
            Some(FailOn::GetRepo(e)) if expected == "get_repo" => Some(Err(e.clone())),
            Some(FailOn::CreateFork(e)) if expected == "create_fork" => Some(Err(e.clone())),
            Some(FailOn::GetRef(e)) if expected == "get_ref" => Some(Err(e.clone())),
            Some(FailOn::CreateRef(e)) if expected == "create_ref" => Some(Err(e.clone())),
            Some(FailOn::UpdateRef(e)) if expected == "update_ref" => Some(Err(e.clone())),
            Some(FailOn::GetContents(e)) if expected == "get_contents" => Some(Err(e.clone())),
            Some(FailOn::PutContents(e)) if expected == "put_contents" => Some(Err(e.clone())),
            Some(FailOn::CreatePr(e)) if expected == "create_pr" => Some(Err(e.clone())),
            _ => None,
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForgeInner {
    fn new_commit(&mut self, parents: Vec<Oid>, files: BTreeMap<String, Vec<u8>>) -> Oid {
        self.next_object += 1;
        let digest = Sha256::digest(format!("mock-commit-{}", self.next_object).as_bytes());
        let oid = Oid::new(&hex::encode(digest)[..40]).expect("sha256 hex is a valid oid");
        self.commits.insert(oid.clone(), MockCommit { parents, files });
        oid
    }

    fn repo(&self, id: &RepoId) -> Result<&MockRepo, ForgeError> {
        self.repos
            .get(id)
            .ok_or_else(|| ForgeError::NotFound(format!("repository {}", id)))
    }

    fn repo_mut(&mut self, id: &RepoId) -> Result<&mut MockRepo, ForgeError> {
        self.repos
            .get_mut(id)
            .ok_or_else(|| ForgeError::NotFound(format!("repository {}", id)))
    }

    fn head(&self, repo: &RepoId, branch: &BranchName) -> Option<Oid> {
        self.repos
            .get(repo)?
            .refs
            .get(RefName::for_branch(branch).as_str())
            .cloned()
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> bool {
        let mut queue = VecDeque::from([descendant.clone()]);
        let mut seen = HashSet::new();
        while let Some(oid) = queue.pop_front() {
            if &oid == ancestor {
                return true;
            }
            if !seen.insert(oid.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&oid) {
                queue.extend(commit.parents.iter().cloned());
            }
        }
        false
    }

    /// Commit a file on top of a branch tip and advance the branch.
    fn write_file(
        &mut self,
        repo: &RepoId,
        branch: &BranchName,
        path: &str,
        content: Vec<u8>,
    ) -> Result<Oid, ForgeError> {
        self.repo(repo)?;
        let parent = self
            .head(repo, branch)
            .ok_or_else(|| ForgeError::NotFound(format!("Branch {} not found", branch)))?;
        let mut files = self
            .commits
            .get(&parent)
            .map(|c| c.files.clone())
            .unwrap_or_default();
        files.insert(path.to_string(), content);

        let oid = self.new_commit(vec![parent], files);
        self.repo_mut(repo)?
            .refs
            .insert(RefName::for_branch(branch).as_str().to_string(), oid.clone());
        Ok(oid)
    }

    fn apply_pending_writes(&mut self, repo: &RepoId, branch: &BranchName) {
        let (due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_writes)
            .into_iter()
            .partition(|w| &w.repo == repo && &w.branch == branch);
        self.pending_writes = rest;
        for write in due {
            // A vanished branch just drops the simulated write.
            let _ = self.write_file(&write.repo, &write.branch, &write.path, write.content);
        }
    }
}

/// Content-addressed token for file bytes.
fn blob_sha(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))[..40].to_string()
}

fn unprocessable(message: &str, detail: impl Into<String>) -> ForgeError {
    ForgeError::Unprocessable {
        message: message.to_string(),
        details: vec![detail.into()],
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_repo(&self, repo: &RepoId) -> Result<Repository, ForgeError> {
        self.record(MockOperation::GetRepo { repo: repo.clone() });

        if let Some(result) = self.check_fail("get_repo") {
            return result;
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner.repo(repo)?.info.clone())
    }

    async fn create_fork(&self, repo: &RepoId) -> Result<Repository, ForgeError> {
        self.record(MockOperation::CreateFork { repo: repo.clone() });

        if let Some(result) = self.check_fail("create_fork") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        let upstream = inner.repo(repo)?;
        let fork_id = RepoId::new(inner.login.clone(), repo.name())
            .map_err(|e| ForgeError::ApiError {
                status: 500,
                message: e.to_string(),
            })?;

        if let Some(existing) = inner.repos.get(&fork_id) {
            return Ok(existing.info.clone());
        }

        let fork = MockRepo {
            info: Repository {
                id: fork_id.clone(),
                default_branch: upstream.info.default_branch.clone(),
                url: format!("https://github.com/{}", fork_id),
                is_fork: true,
            },
            refs: upstream.refs.clone(),
            pulls: Vec::new(),
        };
        let info = fork.info.clone();
        inner.repos.insert(fork_id, fork);
        Ok(info)
    }

    async fn get_ref(&self, repo: &RepoId, name: &RefName) -> Result<GitRef, ForgeError> {
        self.record(MockOperation::GetRef {
            repo: repo.clone(),
            name: name.clone(),
        });

        if let Some(result) = self.check_fail("get_ref") {
            return result;
        }

        let inner = self.inner.lock().unwrap();
        let sha = inner
            .repo(repo)?
            .refs
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("ref {} in {}", name, repo)))?;
        Ok(GitRef {
            name: name.clone(),
            sha,
        })
    }

    async fn create_ref(
        &self,
        repo: &RepoId,
        name: &RefName,
        sha: &Oid,
    ) -> Result<GitRef, ForgeError> {
        self.record(MockOperation::CreateRef {
            repo: repo.clone(),
            name: name.clone(),
            sha: sha.clone(),
        });

        if let Some(result) = self.check_fail("create_ref") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        if !inner.commits.contains_key(sha) {
            return Err(unprocessable("Object does not exist", sha.as_str()));
        }
        let target = inner.repo_mut(repo)?;
        if target.refs.contains_key(name.as_str()) {
            return Err(unprocessable("Reference already exists", name.as_str()));
        }
        target.refs.insert(name.as_str().to_string(), sha.clone());
        Ok(GitRef {
            name: name.clone(),
            sha: sha.clone(),
        })
    }

    async fn update_ref(
        &self,
        repo: &RepoId,
        name: &RefName,
        sha: &Oid,
        force: bool,
    ) -> Result<GitRef, ForgeError> {
        self.record(MockOperation::UpdateRef {
            repo: repo.clone(),
            name: name.clone(),
            sha: sha.clone(),
            force,
        });

        if let Some(result) = self.check_fail("update_ref") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        if !inner.commits.contains_key(sha) {
            return Err(unprocessable("Object does not exist", sha.as_str()));
        }
        let current = inner
            .repo(repo)?
            .refs
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| unprocessable("Reference does not exist", name.as_str()))?;
        if !force && !inner.is_ancestor(&current, sha) {
            return Err(unprocessable("Update is not a fast forward", name.as_str()));
        }

        inner
            .repo_mut(repo)?
            .refs
            .insert(name.as_str().to_string(), sha.clone());
        Ok(GitRef {
            name: name.clone(),
            sha: sha.clone(),
        })
    }

    async fn get_contents(
        &self,
        repo: &RepoId,
        path: &str,
        branch: &BranchName,
    ) -> Result<FileContent, ForgeError> {
        self.record(MockOperation::GetContents {
            repo: repo.clone(),
            path: path.to_string(),
            branch: branch.clone(),
        });

        if let Some(result) = self.check_fail("get_contents") {
            return result;
        }

        let inner = self.inner.lock().unwrap();
        inner.repo(repo)?;
        let head = inner
            .head(repo, branch)
            .ok_or_else(|| ForgeError::NotFound(format!("No commit found for the ref {}", branch)))?;
        let content = inner
            .commits
            .get(&head)
            .and_then(|c| c.files.get(path))
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("{} on {}", path, branch)))?;

        Ok(FileContent {
            path: path.to_string(),
            sha: blob_sha(&content),
            content,
        })
    }

    async fn put_contents(
        &self,
        repo: &RepoId,
        request: PutContentsRequest,
    ) -> Result<ContentUpdate, ForgeError> {
        self.record(MockOperation::PutContents {
            repo: repo.clone(),
            path: request.path.clone(),
            branch: request.branch.clone(),
            sha: request.sha.clone(),
        });

        if let Some(result) = self.check_fail("put_contents") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.apply_pending_writes(repo, &request.branch);

        inner.repo(repo)?;
        let head = inner
            .head(repo, &request.branch)
            .ok_or_else(|| ForgeError::NotFound(format!("Branch {} not found", request.branch)))?;
        let existing = inner
            .commits
            .get(&head)
            .and_then(|c| c.files.get(&request.path))
            .map(|bytes| blob_sha(bytes));

        match (&request.sha, existing) {
            (None, Some(_)) => {
                return Err(unprocessable(
                    "Invalid request.",
                    "\"sha\" wasn't supplied.",
                ))
            }
            (Some(given), Some(current)) if *given != current => {
                return Err(ForgeError::Conflict(format!(
                    "{} does not match {}",
                    request.path, given
                )))
            }
            (Some(given), None) => {
                return Err(ForgeError::Conflict(format!(
                    "{} does not match {}",
                    request.path, given
                )))
            }
            _ => {}
        }

        let sha = blob_sha(&request.content);
        let commit = inner.write_file(repo, &request.branch, &request.path, request.content)?;
        Ok(ContentUpdate {
            content: ContentRef {
                path: request.path,
                sha,
            },
            commit: CommitRef {
                sha: commit,
                message: request.message,
            },
        })
    }

    async fn create_pr(
        &self,
        repo: &RepoId,
        request: CreatePrRequest,
    ) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            repo: repo.clone(),
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
            draft: request.draft,
        });

        if let Some(result) = self.check_fail("create_pr") {
            return result;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.repo(repo)?;

        // `owner:branch` names a branch in owner's fork of this repository.
        let (head_owner, head_branch) = match request.head.split_once(':') {
            Some((owner, branch)) => (owner.to_string(), branch.to_string()),
            None => (repo.owner().to_string(), request.head.clone()),
        };
        let head_tip = RepoId::new(head_owner, repo.name())
            .ok()
            .zip(BranchName::new(head_branch.clone()).ok())
            .and_then(|(head_repo, branch)| inner.head(&head_repo, &branch))
            .ok_or_else(|| unprocessable("Validation Failed", "head invalid"))?;
        let base_tip = BranchName::new(request.base.clone())
            .ok()
            .and_then(|branch| inner.head(repo, &branch))
            .ok_or_else(|| unprocessable("Validation Failed", "base invalid"))?;

        let duplicate = inner.repo(repo)?.pulls.iter().any(|p| {
            p.pr.state == PrState::Open && p.pr.base == request.base && p.head == request.head
        });
        if duplicate {
            return Err(unprocessable(
                "Validation Failed",
                format!("A pull request already exists for {}.", request.head),
            ));
        }
        if inner.is_ancestor(&head_tip, &base_tip) {
            return Err(unprocessable(
                "Validation Failed",
                format!("No commits between {} and {}", request.base, request.head),
            ));
        }

        let number = inner.next_pr_number;
        inner.next_pr_number += 1;

        let pr = PullRequest {
            number,
            url: format!("https://github.com/{}/pull/{}", repo, number),
            state: PrState::Open,
            is_draft: request.draft,
            head: head_branch,
            base: request.base,
            title: request.title,
            body: request.body,
        };

        inner.repo_mut(repo)?.pulls.push(MockPull {
            head: request.head,
            pr: pr.clone(),
        });
        Ok(pr)
    }
}
