//! Bulk import of an on-disk module cache.
//!
//! Walks a toolchain download-cache layout (`{module}/@v/list` plus
//! per-version artifact files) and inserts every listed version into the
//! module repository as a warm-up before serving.

use std::io;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::record::ModuleRecord;
use crate::resolver::escape;
use crate::store::ModuleRepository;

pub fn import_cached_modules(repository: &dyn ModuleRepository, root: &Path) -> Result<()> {
    if !root.is_dir() {
        return Err(Error::Storage(format!(
            "module cache directory {} does not exist",
            root.display()
        )));
    }

    let mut imported = 0usize;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| Error::Storage(format!("failed to walk cache: {e}")))?;
        if !entry.file_type().is_dir() || entry.file_name() != "@v" {
            continue;
        }
        imported += import_version_dir(repository, root, entry.path())?;
    }

    info!(versions = imported, root = %root.display(), "imported local module cache");
    Ok(())
}

fn import_version_dir(
    repository: &dyn ModuleRepository,
    root: &Path,
    dir: &Path,
) -> Result<usize> {
    let escaped = match dir.parent().and_then(|p| p.strip_prefix(root).ok()) {
        Some(rel) if rel.as_os_str().is_empty() => return Ok(0),
        Some(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        None => return Ok(0),
    };

    // Cache directories carry case-escaped names; store records are keyed
    // by the canonical path. Directories that do not decode are not part
    // of a module cache.
    let module = match escape::unescape_path(&escaped) {
        Ok(module) => module,
        Err(_) => {
            debug!(dir = %dir.display(), "skipping non-module directory");
            return Ok(0);
        }
    };

    let list = match std::fs::read_to_string(dir.join("list")) {
        Ok(list) => list,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(Error::Storage(format!(
                "failed to read {}: {e}",
                dir.join("list").display()
            )))
        }
    };

    let mut imported = 0;
    for token in list.lines() {
        let version = token.trim();
        if version.is_empty() {
            continue;
        }

        let mod_file = std::fs::read(dir.join(format!("{version}.mod"))).map_err(|e| {
            Error::Storage(format!("missing {version}.mod for {module}: {e}"))
        })?;
        let info = read_optional(dir, version, ".info")?;
        let zip = read_optional(dir, version, ".zip")?;
        let zip_hash = read_optional(dir, version, ".ziphash")?;

        let record = ModuleRecord {
            name: module.clone(),
            version: version.to_string(),
            info: info.unwrap_or_default(),
            mod_file,
            zip: zip.unwrap_or_default(),
            zip_hash: String::from_utf8_lossy(&zip_hash.unwrap_or_default()).into_owned(),
        };

        // AlreadyExists is fine: the importer may run again over a cache
        // that was already picked up.
        repository.insert(&record)?;
        imported += 1;
        debug!(module = %module, version = %version, "imported cached module");
    }

    Ok(imported)
}

fn read_optional(dir: &Path, version: &str, suffix: &str) -> Result<Option<Vec<u8>>> {
    match std::fs::read(dir.join(format!("{version}{suffix}"))) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Storage(format!(
            "failed to read {version}{suffix}: {e}"
        ))),
    }
}
