//! Git-backed [`Vcs`] implementation.
//!
//! Shells out to the `git` binary. Every checkout lives in a scoped
//! temporary directory that is removed on all exit paths, including
//! errors and cancellation.

use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{ModuleRecord, Origin, VersionInfo};
use crate::vcs::{archive, dirhash, Vcs};

pub struct Git {
    binary: String,
    temp_root: Option<PathBuf>,
}

impl Git {
    pub fn new() -> Self {
        Self {
            binary: "git".to_string(),
            temp_root: None,
        }
    }

    /// Root directory for per-clone scratch space. Defaults to the
    /// system temporary directory.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// Run one git subcommand; a nonzero exit surfaces as [`Error::Vcs`]
    /// carrying the combined output.
    async fn run(&self, context: &str, args: &[&str]) -> Result<Vec<u8>> {
        debug!(binary = %self.binary, ?args, "running vcs command");
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::Vcs(format!("{context}: {e}")))?;

        if !output.status.success() {
            let mut combined = output.stdout;
            combined.extend_from_slice(&output.stderr);
            return Err(Error::Vcs(format!(
                "{context}: {}\n{}",
                output.status,
                String::from_utf8_lossy(&combined)
            )));
        }

        Ok(output.stdout)
    }
}

impl Default for Git {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Vcs for Git {
    async fn fetch_tags(&self, repo: &str) -> Result<Vec<String>> {
        let url = canonical_repo_url(repo);
        let out = self
            .run("failed to fetch tags", &["ls-remote", "--tags", &url])
            .await?;

        Ok(parse_ls_remote(&String::from_utf8_lossy(&out)))
    }

    async fn clone_module(&self, repo: &str, tag: &str) -> Result<ModuleRecord> {
        let url = canonical_repo_url(repo);

        let checkout = match &self.temp_root {
            Some(root) => TempDir::with_prefix_in("module-", root),
            None => TempDir::with_prefix("module-"),
        }
        .map_err(|e| Error::Vcs(format!("failed to create temp dir: {e}")))?;
        let dir = checkout.path().to_string_lossy().into_owned();

        self.run(
            "failed to clone repo",
            &["clone", "--depth", "1", "--branch", tag, &url, &dir],
        )
        .await?;

        let time = self
            .run(
                "failed to get commit time",
                &["-C", &dir, "--no-pager", "show", "-s", "--format=%cI", tag],
            )
            .await?;
        let time = String::from_utf8_lossy(&time).trim_end().to_string();

        let full_ref = self
            .run(
                "failed to get refs name",
                &["-C", &dir, "--no-pager", "rev-parse", "--symbolic-full-name", tag],
            )
            .await?;
        let full_ref = String::from_utf8_lossy(&full_ref).trim_end().to_string();

        let prefix = format!("{repo}@{tag}");
        let zip = archive::zip_dir(checkout.path(), &prefix)?;
        let zip_hash = dirhash::hash_dir(checkout.path(), &prefix)?;

        let mod_file = std::fs::read(checkout.path().join("go.mod"))
            .map_err(|e| Error::Vcs(format!("failed to read go.mod: {e}")))?;

        let info = VersionInfo {
            version: tag.to_string(),
            time,
            origin: Origin {
                vcs: "git".to_string(),
                url,
                hash: zip_hash.clone(),
                reference: full_ref,
            },
        };
        let info = serde_json::to_vec(&info)
            .map_err(|e| Error::Vcs(format!("failed to encode info: {e}")))?;

        Ok(ModuleRecord {
            name: repo.to_string(),
            version: tag.to_string(),
            info,
            mod_file,
            zip,
            zip_hash,
        })
    }
}

/// Extract leaf tag names from `git ls-remote --tags` output. Peeled
/// `^{}` entries duplicate their tag and are skipped.
fn parse_ls_remote(out: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for line in out.lines() {
        let Some((_, reference)) = line.split_once('\t') else {
            continue;
        };
        if reference.ends_with("^{}") {
            continue;
        }
        match reference.rsplit('/').next() {
            Some(tag) if !tag.is_empty() => tags.push(tag.to_string()),
            _ => {}
        }
    }
    tags
}

/// Strip a trailing major-version path segment (`/vN`, N >= 2): those
/// modules live under a subpath of the import path but at the repo root
/// in version control.
fn strip_major_suffix(path: &str) -> &str {
    let trimmed = path.trim();
    if let Some((head, last)) = trimmed.rsplit_once('/') {
        if let Some(digits) = last.strip_prefix('v') {
            let is_major = !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && digits.parse::<u64>().is_ok_and(|n| n >= 2);
            if is_major {
                return head;
            }
        }
    }
    trimmed
}

/// Resolve an import path to a cloneable URL.
pub(crate) fn canonical_repo_url(repo: &str) -> String {
    let repo = strip_major_suffix(repo);
    if repo.starts_with("http://") || repo.starts_with("https://") {
        return repo.to_string();
    }
    format!("https://{repo}")
}
