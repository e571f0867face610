//! Content hash over a module tree.
//!
//! The ecosystem's `h1` dirhash: a SHA-256 over the sorted listing of
//! per-file SHA-256 digests, one `"{hex}  {name}\n"` line per file with
//! names rooted at the `{module}@{version}` prefix, base64-encoded. The
//! file set is the same one the archive writer covers, so the hash always
//! describes the served archive.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::vcs::archive;

pub fn hash_dir(root: &Path, prefix: &str) -> Result<String> {
    let mut listing = Sha256::new();
    for (rel, path) in archive::tree_files(root)? {
        let data = std::fs::read(&path)
            .map_err(|e| Error::Vcs(format!("failed to read {rel}: {e}")))?;
        let digest = Sha256::digest(&data);
        listing.update(format!("{}  {prefix}/{rel}\n", hex::encode(digest)));
    }
    Ok(format!("h1:{}", BASE64.encode(listing.finalize())))
}
