//! cli::commands::submit
//!
//! Run the whole fork workflow in one go.
//!
//! # Algorithm
//!
//! 1. Read every local file (fail before touching the hosting service)
//! 2. Ensure the fork exists
//! 3. Create the fork branch from upstream, or sync it if it exists
//! 4. For each file: create it, or update it when it already exists
//! 5. Open the pull request
//!
//! # Example
//!
//! ```bash
//! forksync submit --repo octocat/hello-world --branch docs-fix \
//!     --file README.md=./README.md --file docs/guide.md=./guide.md \
//!     -m "Fix typos" --title "Fix typos in docs"
//! ```

use anyhow::{Context as _, Result};

use super::{branch_arg, open_manager, upstream_branch_or_default};
use crate::cli::args::{FileMapping, UpstreamArgs};
use crate::cli::Context;
use crate::fork::{ForkError, ForkedBranch};
use crate::forge::ContentUpdate;

/// Submit options parsed from CLI arguments.
#[derive(Debug)]
pub struct SubmitOptions<'a> {
    pub from: Option<&'a str>,
    pub branch: &'a str,
    pub force: bool,
    pub files: &'a [FileMapping],
    pub message: &'a str,
    pub title: Option<&'a str>,
    pub body: Option<&'a str>,
    pub draft: bool,
}

/// Run the submit command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn submit(ctx: &Context, upstream: &UpstreamArgs, opts: SubmitOptions<'_>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(submit_async(ctx, upstream, opts))
}

async fn submit_async(
    ctx: &Context,
    upstream: &UpstreamArgs,
    opts: SubmitOptions<'_>,
) -> Result<()> {
    let downstream = branch_arg(opts.branch)?;
    let contents = opts
        .files
        .iter()
        .map(|file| {
            std::fs::read(&file.local_path)
                .with_context(|| format!("failed to read '{}'", file.local_path.display()))
                .map(|bytes| (file.repo_path.as_str(), bytes))
        })
        .collect::<Result<Vec<_>>>()?;

    let manager = open_manager(ctx, upstream).await?;
    let upstream_branch = upstream_branch_or_default(&manager, opts.from)?;
    let force = opts.force || ctx.config.sync_force();
    let handle = manager
        .create_or_sync_branch_from_upstream(&upstream_branch, &downstream, force)
        .await?;

    for (path, bytes) in contents {
        let update = write_file(&handle, path, opts.message, bytes).await?;
        if !ctx.quiet {
            println!("{} {}", update.commit.sha.short(7), update.content.path);
        }
    }

    let title = opts.title.unwrap_or(opts.message);
    let pr = if opts.draft || ctx.config.pull_request_draft() {
        handle.create_draft_pull(title, opts.body).await?
    } else {
        handle.create_pull(title, opts.body).await?
    };

    println!("{}", pr.url);
    Ok(())
}

/// Create `path`, falling back to an update when it already exists.
async fn write_file(
    handle: &ForkedBranch,
    path: &str,
    message: &str,
    bytes: Vec<u8>,
) -> Result<ContentUpdate> {
    match handle.create_file(path, message, &bytes).await {
        Ok(update) => Ok(update),
        Err(ForkError::Conflict(_)) => {
            tracing::debug!(path, "file exists, updating instead");
            Ok(handle.update_content(path, message, &bytes).await?)
        }
        Err(err) => Err(err.into()),
    }
}
