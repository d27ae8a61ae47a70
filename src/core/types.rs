//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoId`] - Hosting-side repository identity (owner/name)
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Validated Git reference name
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a malformed branch or repository name is
//! rejected before any request reaches the hosting service.
//!
//! # Examples
//!
//! ```
//! use forksync::core::types::{BranchName, Oid, RefName, RepoId};
//!
//! let repo = RepoId::parse_full_name("octocat/hello-world").unwrap();
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::for_branch(&branch);
//!
//! assert_eq!(repo.full_name(), "octocat/hello-world");
//! assert_eq!(refname.as_str(), "refs/heads/feature/my-branch");
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid repository: {0}")]
    InvalidRepo(String),
}

/// A repository on the hosting service, identified by owner and name.
///
/// The owner is a user or organization login.
///
/// # Example
///
/// ```
/// use forksync::core::types::RepoId;
///
/// let repo = RepoId::new("octocat", "hello-world").unwrap();
/// assert_eq!(repo.owner(), "octocat");
/// assert_eq!(repo.name(), "hello-world");
/// assert_eq!(repo.to_string(), "octocat/hello-world");
///
/// assert!(RepoId::new("", "hello-world").is_err());
/// assert!(RepoId::new("octo/cat", "hello-world").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Create a repository id from its owner and name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepo` if either part is empty or contains
    /// a `/` or whitespace.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let name = name.into();
        Self::validate_part("owner", &owner)?;
        Self::validate_part("name", &name)?;
        Ok(Self { owner, name })
    }

    /// Parse a full name in `owner/name` form.
    ///
    /// # Example
    ///
    /// ```
    /// use forksync::core::types::RepoId;
    ///
    /// let repo = RepoId::parse_full_name("rust-lang/rust").unwrap();
    /// assert_eq!(repo.owner(), "rust-lang");
    ///
    /// assert!(RepoId::parse_full_name("rust").is_err());
    /// assert!(RepoId::parse_full_name("a/b/c").is_err());
    /// ```
    pub fn parse_full_name(full_name: &str) -> Result<Self, TypeError> {
        match full_name.split_once('/') {
            Some((owner, name)) if !name.contains('/') => Self::new(owner, name),
            _ => Err(TypeError::InvalidRepo(format!(
                "'{}' is not in owner/name form",
                full_name
            ))),
        }
    }

    /// Identify a repository from a web URL.
    ///
    /// Only the last two `/`-separated segments are inspected and they are
    /// taken verbatim: no `.git` stripping and no trailing-slash handling.
    /// Enterprise URLs with deeper path prefixes still resolve because the
    /// prefix is ignored, but anything after the repository name does not.
    ///
    /// # Example
    ///
    /// ```
    /// use forksync::core::types::RepoId;
    ///
    /// let repo = RepoId::from_url("https://github.com/octocat/hello-world").unwrap();
    /// assert_eq!(repo.full_name(), "octocat/hello-world");
    ///
    /// // Trailing slash leaves an empty name segment.
    /// assert!(RepoId::from_url("https://github.com/octocat/hello-world/").is_err());
    /// ```
    pub fn from_url(url: &str) -> Result<Self, TypeError> {
        let mut segments = url.rsplit('/');
        match (segments.next(), segments.next()) {
            (Some(name), Some(owner)) => Self::new(owner, name),
            _ => Err(TypeError::InvalidRepo(format!(
                "cannot find owner/name in '{}'",
                url
            ))),
        }
    }

    /// The owning user or organization login.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `owner/name` form.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    fn validate_part(what: &str, part: &str) -> Result<(), TypeError> {
        if part.is_empty() {
            return Err(TypeError::InvalidRepo(format!(
                "repository {} cannot be empty",
                what
            )));
        }
        if part.contains('/') || part.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidRepo(format!(
                "repository {} '{}' contains '/' or whitespace",
                what, part
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use forksync::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }
        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        validate_ref_text(name).map_err(TypeError::InvalidBranchName)
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use forksync::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full OID if shorter.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, fully qualified Git reference name.
///
/// # Example
///
/// ```
/// use forksync::core::types::{BranchName, RefName};
///
/// let branch = BranchName::new("feature/foo").unwrap();
/// let refname = RefName::for_branch(&branch);
/// assert_eq!(refname.as_str(), "refs/heads/feature/foo");
/// assert_eq!(refname.api_path(), "heads/feature/foo");
/// assert_eq!(refname.branch_name().unwrap(), branch);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name is not under `refs/`
    /// or violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if !name.starts_with("refs/") {
            return Err(TypeError::InvalidRefName(format!(
                "'{}' is not a fully qualified ref",
                name
            )));
        }
        validate_ref_text(&name).map_err(TypeError::InvalidRefName)?;
        Ok(Self(name))
    }

    /// Create a ref name for a branch (`refs/heads/<branch>`).
    pub fn for_branch(branch: &BranchName) -> Self {
        // Branch names are already validated
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// The ref without its `refs/` prefix, as used in REST API paths
    /// (e.g. `heads/main`).
    pub fn api_path(&self) -> &str {
        self.0.strip_prefix("refs/").unwrap_or(&self.0)
    }

    /// The branch this ref points at, if it is a branch ref.
    pub fn branch_name(&self) -> Option<BranchName> {
        self.0
            .strip_prefix("refs/heads/")
            .and_then(|b| BranchName::new(b).ok())
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rules shared by branch and ref names.
fn validate_ref_text(name: &str) -> Result<(), String> {
    if name.starts_with('/') || name.ends_with('/') {
        return Err("name cannot start or end with '/'".into());
    }
    if name.ends_with(".lock") {
        return Err("name cannot end with '.lock'".into());
    }
    for bad in ["..", "@{", "//"] {
        if name.contains(bad) {
            return Err(format!("name cannot contain '{bad}'"));
        }
    }

    const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(format!("name cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("name cannot contain control characters".into());
    }

    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod repo_id {
        use super::*;

        #[test]
        fn full_name_roundtrip() {
            let repo = RepoId::parse_full_name("my-org/my.repo").unwrap();
            assert_eq!(repo.owner(), "my-org");
            assert_eq!(repo.name(), "my.repo");
            assert_eq!(repo.full_name(), "my-org/my.repo");
        }

        #[test]
        fn full_name_needs_exactly_one_slash() {
            assert!(RepoId::parse_full_name("").is_err());
            assert!(RepoId::parse_full_name("owner").is_err());
            assert!(RepoId::parse_full_name("owner/").is_err());
            assert!(RepoId::parse_full_name("/repo").is_err());
            assert!(RepoId::parse_full_name("a/b/c").is_err());
        }

        #[test]
        fn url_takes_last_two_segments() {
            let repo = RepoId::from_url("https://github.com/octocat/hello-world").unwrap();
            assert_eq!(repo, RepoId::new("octocat", "hello-world").unwrap());

            let enterprise =
                RepoId::from_url("https://git.example.com/gh/team/octocat/hello-world").unwrap();
            assert_eq!(enterprise.full_name(), "octocat/hello-world");
        }

        #[test]
        fn url_segments_are_verbatim() {
            let repo = RepoId::from_url("https://github.com/octocat/hello-world.git").unwrap();
            assert_eq!(repo.name(), "hello-world.git");

            // Anything after the name shifts the window.
            let repo = RepoId::from_url("https://github.com/octocat/hello-world/tree/main").unwrap();
            assert_eq!(repo.full_name(), "tree/main");
        }

        #[test]
        fn url_without_two_segments_rejected() {
            assert!(RepoId::from_url("hello-world").is_err());
            assert!(RepoId::from_url("https://github.com/octocat/").is_err());
        }

        #[test]
        fn whitespace_rejected() {
            assert!(RepoId::new("octo cat", "repo").is_err());
            assert!(RepoId::new("octocat", "re\tpo").is_err());
        }
    }

    mod branch_name {
        use super::*;

        #[test]
        fn valid_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/foo").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn invalid_names() {
            assert!(BranchName::new("").is_err());
            assert!(BranchName::new("@").is_err());
            assert!(BranchName::new("-flag").is_err());
            assert!(BranchName::new(".hidden").is_err());
            assert!(BranchName::new("foo/.hidden").is_err());
            assert!(BranchName::new("branch.lock").is_err());
            assert!(BranchName::new("branch/").is_err());
            assert!(BranchName::new("bad..path").is_err());
            assert!(BranchName::new("foo@{bar").is_err());
            assert!(BranchName::new("foo//bar").is_err());
            assert!(BranchName::new("has:colon").is_err());
            assert!(BranchName::new("has\nnewline").is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let name = BranchName::new("feature/test").unwrap();
            let json = serde_json::to_string(&name).unwrap();
            let parsed: BranchName = serde_json::from_str(&json).unwrap();
            assert_eq!(name, parsed);
        }

        #[test]
        fn serde_rejects_invalid() {
            let result: Result<BranchName, _> = serde_json::from_str("\"bad..name\"");
            assert!(result.is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn normalizes_case() {
            let oid = Oid::new("ABCDEF1234567890ABCDEF1234567890ABCDEF12").unwrap();
            assert_eq!(oid.as_str(), "abcdef1234567890abcdef1234567890abcdef12");
        }

        #[test]
        fn sha256_length_accepted() {
            assert!(Oid::new("a".repeat(64)).is_ok());
        }

        #[test]
        fn wrong_length_rejected() {
            assert!(Oid::new("abc123").is_err());
            assert!(Oid::new("a".repeat(41)).is_err());
        }

        #[test]
        fn non_hex_rejected() {
            assert!(Oid::new("g".repeat(40)).is_err());
        }

        #[test]
        fn short_clamps() {
            let oid = Oid::new("a".repeat(40)).unwrap();
            assert_eq!(oid.short(7), "aaaaaaa");
            assert_eq!(oid.short(100).len(), 40);
        }
    }

    mod ref_name {
        use super::*;

        #[test]
        fn for_branch() {
            let branch = BranchName::new("main").unwrap();
            let refname = RefName::for_branch(&branch);
            assert_eq!(refname.as_str(), "refs/heads/main");
            assert_eq!(refname.api_path(), "heads/main");
        }

        #[test]
        fn must_be_qualified() {
            assert!(RefName::new("heads/main").is_err());
            assert!(RefName::new("refs/heads/main").is_ok());
        }

        #[test]
        fn branch_name_only_for_heads() {
            let tag = RefName::new("refs/tags/v1.0").unwrap();
            assert!(tag.branch_name().is_none());

            let head = RefName::new("refs/heads/feature/x").unwrap();
            assert_eq!(head.branch_name().unwrap().as_str(), "feature/x");
        }
    }
}
