//! Version-control adapter for private modules.
//!
//! Modules whose import path matches the private-prefix set never touch
//! the upstream proxy; they are listed and materialized straight from
//! their repository.

pub mod archive;
pub mod dirhash;
mod git;

pub use git::Git;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::ModuleRecord;

/// Materializes modules directly from a version-control system.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// List the tag names published by `repo`'s remote.
    async fn fetch_tags(&self, repo: &str) -> Result<Vec<String>>;

    /// Check out `repo` at `tag` and build the complete module record in
    /// memory: archive, manifest, tree hash, and info document.
    async fn clone_module(&self, repo: &str, tag: &str) -> Result<ModuleRecord>;
}
