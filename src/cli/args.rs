//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--token <token>`: GitHub token (else `$FORKSYNC_TOKEN`, then `$GITHUB_TOKEN`)
//! - `--api-base <url>`: REST API base URL, overriding the config file
//! - `--config <path>`: Config file to load instead of the standard locations

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// forksync - fork a GitHub repository, sync a branch, commit files, open a PR
#[derive(Parser, Debug)]
#[command(name = "forksync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; only errors are logged
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// GitHub token
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// REST API base URL (for GitHub Enterprise)
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// How the upstream repository is named on the command line.
///
/// Exactly one of `--repo` and `--url` must be given.
#[derive(Args, Debug, Clone)]
pub struct UpstreamArgs {
    /// Upstream repository as owner/name
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// Upstream repository web URL (last two path segments are owner/name)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
}

/// A `repo/path=local/path` pair for `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    /// Path inside the repository
    pub repo_path: String,
    /// Local file whose bytes are committed
    pub local_path: PathBuf,
}

impl std::str::FromStr for FileMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((repo_path, local_path)) if !repo_path.is_empty() && !local_path.is_empty() => {
                Ok(Self {
                    repo_path: repo_path.to_string(),
                    local_path: PathBuf::from(local_path),
                })
            }
            _ => Err(format!("expected REPO_PATH=LOCAL_PATH, got '{}'", s)),
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ensure a fork of the upstream repository exists
    #[command(
        name = "fork",
        after_help = "\
EXAMPLES:
    forksync fork --repo octocat/hello-world
    forksync fork --url https://github.com/octocat/hello-world"
    )]
    Fork {
        #[command(flatten)]
        upstream: UpstreamArgs,
    },

    /// Create a fork branch from an upstream branch
    #[command(
        name = "branch",
        long_about = "Create a branch in your fork at the tip of an upstream branch.\n\n\
            With --sync an existing fork branch is fast-forwarded to the upstream tip \
            instead of failing. A fork branch that has diverged is only overwritten \
            with --force.",
        after_help = "\
EXAMPLES:
    forksync branch --repo octocat/hello-world --from main --to docs-fix
    forksync branch --repo octocat/hello-world --to docs-fix --sync --force"
    )]
    Branch {
        #[command(flatten)]
        upstream: UpstreamArgs,

        /// Upstream branch (defaults to the upstream default branch)
        #[arg(long, value_name = "BRANCH")]
        from: Option<String>,

        /// Fork branch to create
        #[arg(long, value_name = "BRANCH")]
        to: String,

        /// Sync the fork branch if it already exists
        #[arg(long)]
        sync: bool,

        /// Overwrite a diverged fork branch when syncing
        #[arg(long, requires = "sync")]
        force: bool,
    },

    /// Create or update one file on a fork branch
    #[command(name = "put")]
    Put {
        #[command(flatten)]
        upstream: UpstreamArgs,

        /// Fork branch to commit to
        #[arg(long, value_name = "BRANCH")]
        branch: String,

        /// Upstream branch the fork branch tracks (defaults to the upstream default branch)
        #[arg(long, value_name = "BRANCH")]
        base: Option<String>,

        /// Path inside the repository
        #[arg(long, value_name = "REPO_PATH")]
        path: String,

        /// Local file whose contents are committed
        #[arg(long, value_name = "FILE")]
        source: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Replace an existing file instead of creating a new one
        #[arg(long)]
        update: bool,
    },

    /// Open a pull request from a fork branch to upstream
    #[command(name = "pr")]
    Pr {
        #[command(flatten)]
        upstream: UpstreamArgs,

        /// Fork branch with the changes
        #[arg(long, value_name = "BRANCH")]
        branch: String,

        /// Upstream branch to merge into (defaults to the upstream default branch)
        #[arg(long, value_name = "BRANCH")]
        base: Option<String>,

        /// Pull request title
        #[arg(long)]
        title: String,

        /// Pull request body
        #[arg(long)]
        body: Option<String>,

        /// Open as draft
        #[arg(long)]
        draft: bool,
    },

    /// Sync a fork branch, commit files to it and open a pull request
    #[command(
        name = "submit",
        long_about = "Run the whole workflow: ensure the fork, create or sync the fork branch \
            from upstream, write every --file (creating it, or updating it when it already \
            exists) and open a pull request.",
        after_help = "\
EXAMPLES:
    forksync submit --repo octocat/hello-world --branch docs-fix \\
        --file README.md=./README.md -m \"Fix typo\" --title \"Fix typo in README\""
    )]
    Submit {
        #[command(flatten)]
        upstream: UpstreamArgs,

        /// Upstream branch (defaults to the upstream default branch)
        #[arg(long, value_name = "BRANCH")]
        from: Option<String>,

        /// Fork branch to create or sync
        #[arg(long, value_name = "BRANCH")]
        branch: String,

        /// Overwrite a diverged fork branch
        #[arg(long)]
        force: bool,

        /// File to commit, as REPO_PATH=LOCAL_PATH (repeatable)
        #[arg(long = "file", value_name = "REPO_PATH=LOCAL_PATH", required = true)]
        files: Vec<FileMapping>,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Pull request title (defaults to the commit message)
        #[arg(long)]
        title: Option<String>,

        /// Pull request body
        #[arg(long)]
        body: Option<String>,

        /// Open as draft
        #[arg(long)]
        draft: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_branch() {
        let cli = Cli::try_parse_from([
            "forksync", "branch", "--repo", "octocat/hello", "--from", "main", "--to", "feature",
            "--sync", "--force",
        ])
        .unwrap();
        match cli.command {
            Command::Branch {
                upstream,
                from,
                to,
                sync,
                force,
            } => {
                assert_eq!(upstream.repo.as_deref(), Some("octocat/hello"));
                assert!(upstream.url.is_none());
                assert_eq!(from.as_deref(), Some("main"));
                assert_eq!(to, "feature");
                assert!(sync && force);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn force_requires_sync() {
        let result = Cli::try_parse_from([
            "forksync", "branch", "--repo", "octocat/hello", "--to", "feature", "--force",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "forksync", "fork", "--repo", "octocat/hello", "--debug", "--api-base",
            "http://localhost:1234",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.api_base.as_deref(), Some("http://localhost:1234"));
    }

    #[test]
    fn file_mapping_parses() {
        let mapping: FileMapping = "docs/a.md=./local/a.md".parse().unwrap();
        assert_eq!(mapping.repo_path, "docs/a.md");
        assert_eq!(mapping.local_path, PathBuf::from("./local/a.md"));

        assert!("no-equals".parse::<FileMapping>().is_err());
        assert!("=local".parse::<FileMapping>().is_err());
    }

    #[test]
    fn submit_requires_a_file() {
        let result = Cli::try_parse_from([
            "forksync", "submit", "--repo", "octocat/hello", "--branch", "feature", "-m", "msg",
        ]);
        assert!(result.is_err());
    }
}
