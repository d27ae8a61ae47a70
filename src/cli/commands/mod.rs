//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Builds a [`ForkManager`] for the upstream repository
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Every command talks to the hosting service, so handlers are synchronous
//! wrappers that run their async implementation on a fresh tokio runtime.

mod branch;
mod fork;
mod pr;
mod put;
mod submit;

pub use branch::branch;
pub use fork::fork;
pub use pr::pr;
pub use put::put;
pub use submit::submit;

use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};

use super::args::{Command, UpstreamArgs};
use super::Context;
use crate::core::types::BranchName;
use crate::forge::github::GitHubForge;
use crate::forge::{Forge, ForgeError};
use crate::fork::{ForkManager, UpstreamSource};

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Fork { upstream } => fork(ctx, &upstream),
        Command::Branch {
            upstream,
            from,
            to,
            sync,
            force,
        } => branch(ctx, &upstream, from.as_deref(), &to, sync, force),
        Command::Put {
            upstream,
            branch,
            base,
            path,
            source,
            message,
            update,
        } => put(
            ctx,
            &upstream,
            put::PutOptions {
                branch: &branch,
                base: base.as_deref(),
                path: &path,
                source: &source,
                message: &message,
                update,
            },
        ),
        Command::Pr {
            upstream,
            branch,
            base,
            title,
            body,
            draft,
        } => pr(
            ctx,
            &upstream,
            &branch,
            base.as_deref(),
            &title,
            body.as_deref(),
            draft,
        ),
        Command::Submit {
            upstream,
            from,
            branch,
            force,
            files,
            message,
            title,
            body,
            draft,
        } => submit(
            ctx,
            &upstream,
            submit::SubmitOptions {
                from: from.as_deref(),
                branch: &branch,
                force,
                files: &files,
                message: &message,
                title: title.as_deref(),
                body: body.as_deref(),
                draft,
            },
        ),
    }
}

/// Resolve the GitHub token: the flag, then `$FORKSYNC_TOKEN`, then
/// `$GITHUB_TOKEN`. Blank values are skipped.
pub fn resolve_token(
    flag: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, ForgeError> {
    flag.map(str::to_string)
        .into_iter()
        .chain(env("FORKSYNC_TOKEN"))
        .chain(env("GITHUB_TOKEN"))
        .find(|token| !token.trim().is_empty())
        .ok_or(ForgeError::AuthRequired)
}

/// Resolve the upstream source and the client, then ensure the fork exists.
///
/// The upstream arguments are checked before the token so a usage mistake
/// is reported as such.
async fn open_manager(ctx: &Context, upstream: &UpstreamArgs) -> Result<ForkManager> {
    let source = UpstreamSource::from_parts(None, upstream.repo.clone(), upstream.url.clone())?;

    let token = resolve_token(ctx.token.as_deref(), |key| std::env::var(key).ok())
        .context("no GitHub token; pass --token or set FORKSYNC_TOKEN or GITHUB_TOKEN")?;
    let forge: Arc<dyn Forge> = Arc::new(
        GitHubForge::new(token, ctx.api_base()).with_user_agent(ctx.config.user_agent()),
    );

    ForkManager::new(forge, source)
        .await
        .context("failed to set up fork")
}

/// Parse a branch argument.
fn branch_arg(name: &str) -> Result<BranchName> {
    BranchName::new(name).with_context(|| format!("invalid branch name '{}'", name))
}

/// The given upstream branch, or the upstream default branch.
fn upstream_branch_or_default(manager: &ForkManager, given: Option<&str>) -> Result<BranchName> {
    match given {
        Some(name) => branch_arg(name),
        None => manager.upstream().default_branch.clone().ok_or_else(|| {
            anyhow!(
                "{} has no default branch; name the upstream branch explicitly",
                manager.upstream().id
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_flag_wins() {
        let token = resolve_token(Some("flag"), |_| Some("env".to_string())).unwrap();
        assert_eq!(token, "flag");
    }

    #[test]
    fn token_env_order() {
        let token = resolve_token(None, |key| match key {
            "FORKSYNC_TOKEN" => Some("forksync".to_string()),
            "GITHUB_TOKEN" => Some("github".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(token, "forksync");

        let token = resolve_token(None, |key| {
            (key == "GITHUB_TOKEN").then(|| "github".to_string())
        })
        .unwrap();
        assert_eq!(token, "github");
    }

    #[test]
    fn blank_tokens_skipped() {
        let token = resolve_token(Some(" "), |key| match key {
            "FORKSYNC_TOKEN" => Some(String::new()),
            "GITHUB_TOKEN" => Some("github".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(token, "github");
    }

    #[test]
    fn missing_token_is_auth_required() {
        assert!(matches!(
            resolve_token(None, |_| None),
            Err(ForgeError::AuthRequired)
        ));
    }
}
