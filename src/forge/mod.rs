//! forge
//!
//! Abstraction over the hosting service (GitHub).
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface the fork workflow needs from the
//! hosting service. The workflow only ever holds an `Arc<dyn Forge>`, so the
//! REST client and the in-memory mock are interchangeable.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait, request/response types and `ForgeError`
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: Mock implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use forksync::forge::github::GitHubForge;
//! use forksync::forge::{CreatePrRequest, Forge};
//!
//! let forge = GitHubForge::with_default_api(token);
//! let pr = forge.create_pr(&upstream, CreatePrRequest {
//!     head: "me:feature".to_string(),
//!     base: "main".to_string(),
//!     title: "Add feature".to_string(),
//!     body: None,
//!     draft: false,
//! }).await?;
//!
//! println!("Created PR #{}: {}", pr.number, pr.url);
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
