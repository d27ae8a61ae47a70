//! cli::commands::pr
//!
//! Open a pull request from a fork branch into an upstream branch.
//!
//! # Example
//!
//! ```bash
//! forksync pr --repo octocat/hello-world --branch docs-fix --title "Fix typo" --draft
//! ```

use anyhow::Result;

use super::{branch_arg, open_manager, upstream_branch_or_default};
use crate::cli::args::UpstreamArgs;
use crate::cli::Context;

/// Run the pr command.
///
/// Prints the pull request URL. `--draft` or `[pull_request] draft = true`
/// opens it as a draft.
pub fn pr(
    ctx: &Context,
    upstream: &UpstreamArgs,
    branch: &str,
    base: Option<&str>,
    title: &str,
    body: Option<&str>,
    draft: bool,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(pr_async(ctx, upstream, branch, base, title, body, draft))
}

async fn pr_async(
    ctx: &Context,
    upstream: &UpstreamArgs,
    branch: &str,
    base: Option<&str>,
    title: &str,
    body: Option<&str>,
    draft: bool,
) -> Result<()> {
    let branch = branch_arg(branch)?;
    let manager = open_manager(ctx, upstream).await?;
    let base = upstream_branch_or_default(&manager, base)?;
    let handle = manager.branch(&base, &branch);

    let pr = if draft || ctx.config.pull_request_draft() {
        handle.create_draft_pull(title, body).await?
    } else {
        handle.create_pull(title, body).await?
    };

    println!("{}", pr.url);
    if !ctx.quiet {
        println!("  #{} {} -> {}", pr.number, handle.head_descriptor(), pr.base);
    }
    Ok(())
}
