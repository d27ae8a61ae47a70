//! cli::commands::branch
//!
//! Create (or create-or-sync) a fork branch from an upstream branch.
//!
//! # Example
//!
//! ```bash
//! # Fail if the fork already has docs-fix
//! forksync branch --repo octocat/hello-world --from main --to docs-fix
//!
//! # Fast-forward an existing docs-fix, overwriting it if it diverged
//! forksync branch --repo octocat/hello-world --to docs-fix --sync --force
//! ```

use anyhow::Result;

use super::{branch_arg, open_manager, upstream_branch_or_default};
use crate::cli::args::UpstreamArgs;
use crate::cli::Context;

/// Run the branch command.
///
/// # Arguments
///
/// * `from` - Upstream branch; the upstream default branch when `None`
/// * `to` - Fork branch to create
/// * `sync` - Sync instead of failing when `to` exists
/// * `force` - Allow a non-fast-forward sync (`[sync] force` in config also enables it)
pub fn branch(
    ctx: &Context,
    upstream: &UpstreamArgs,
    from: Option<&str>,
    to: &str,
    sync: bool,
    force: bool,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(branch_async(ctx, upstream, from, to, sync, force))
}

async fn branch_async(
    ctx: &Context,
    upstream: &UpstreamArgs,
    from: Option<&str>,
    to: &str,
    sync: bool,
    force: bool,
) -> Result<()> {
    let downstream = branch_arg(to)?;
    let manager = open_manager(ctx, upstream).await?;
    let upstream_branch = upstream_branch_or_default(&manager, from)?;

    let handle = if sync {
        let force = force || ctx.config.sync_force();
        manager
            .create_or_sync_branch_from_upstream(&upstream_branch, &downstream, force)
            .await?
    } else {
        manager
            .create_branch_from_upstream(&upstream_branch, &downstream)
            .await?
    };

    let head = handle.head().await?;
    println!("{}:{} {}", handle.fork(), handle.branch(), head.head.short(7));
    if !ctx.quiet {
        println!("  tracks {}:{}", handle.upstream(), handle.upstream_branch());
    }
    Ok(())
}
