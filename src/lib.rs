//! forksync - fork a GitHub repository and keep a branch in sync with upstream
//!
//! forksync automates a narrow hosting workflow: ensure a fork of an upstream
//! repository exists under the caller's account, create or fast-forward a
//! branch in the fork from an upstream branch, commit files to it, and open a
//! pull request back to upstream.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the fork workflow)
//! - [`fork`] - Fork manager, branch synchronizer and forked-branch handle
//! - [`forge`] - Abstraction over the hosting service (GitHub REST, in-memory mock)
//! - [`core`] - Domain types and configuration
//!
//! # Invariants
//!
//! 1. A branch sync that cannot move the fork branch never reports success
//! 2. Syncing branches that already match issues no write
//! 3. File updates are keyed by the observed change token, so concurrent
//!    writes conflict instead of being lost

pub mod cli;
pub mod core;
pub mod forge;
pub mod fork;
