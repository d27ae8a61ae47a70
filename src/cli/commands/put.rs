//! cli::commands::put
//!
//! Create or update one file on a fork branch.
//!
//! # Example
//!
//! ```bash
//! forksync put --repo octocat/hello-world --branch docs-fix \
//!     --path README.md --source ./README.md -m "Fix typo" --update
//! ```

use std::path::Path;

use anyhow::{Context as _, Result};

use super::{branch_arg, open_manager, upstream_branch_or_default};
use crate::cli::args::UpstreamArgs;
use crate::cli::Context;

/// Put options parsed from CLI arguments.
#[derive(Debug)]
pub struct PutOptions<'a> {
    pub branch: &'a str,
    pub base: Option<&'a str>,
    pub path: &'a str,
    pub source: &'a Path,
    pub message: &'a str,
    pub update: bool,
}

/// Run the put command.
pub fn put(ctx: &Context, upstream: &UpstreamArgs, opts: PutOptions<'_>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(put_async(ctx, upstream, opts))
}

async fn put_async(ctx: &Context, upstream: &UpstreamArgs, opts: PutOptions<'_>) -> Result<()> {
    let branch = branch_arg(opts.branch)?;
    let content = std::fs::read(opts.source)
        .with_context(|| format!("failed to read '{}'", opts.source.display()))?;

    let manager = open_manager(ctx, upstream).await?;
    let base = upstream_branch_or_default(&manager, opts.base)?;
    let handle = manager.branch(&base, &branch);

    let update = if opts.update {
        handle.update_content(opts.path, opts.message, content).await?
    } else {
        handle.create_file(opts.path, opts.message, content).await?
    };

    println!("{} {}", update.commit.sha.short(7), update.content.path);
    Ok(())
}
