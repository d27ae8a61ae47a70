//! cli::commands::fork
//!
//! Ensure a fork of the upstream repository exists.
//!
//! # Example
//!
//! ```bash
//! forksync fork --repo octocat/hello-world
//! ```

use anyhow::Result;

use super::open_manager;
use crate::cli::args::UpstreamArgs;
use crate::cli::Context;

/// Run the fork command.
///
/// Prints the fork's full name.
pub fn fork(ctx: &Context, upstream: &UpstreamArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(fork_async(ctx, upstream))
}

async fn fork_async(ctx: &Context, upstream: &UpstreamArgs) -> Result<()> {
    let manager = open_manager(ctx, upstream).await?;

    println!("{}", manager.fork().id);
    if !ctx.quiet {
        println!("  {}", manager.fork().url);
    }
    Ok(())
}
