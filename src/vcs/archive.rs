//! Deterministic module archives.
//!
//! The module archive convention stores every file of the working tree
//! under a `{module}@{version}/` prefix. The writer here keeps the output
//! reproducible: entries sorted by path, fixed timestamps, VCS metadata
//! directories excluded.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::DeflateEncoder;
use flate2::Compression;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Directories never included in a module archive.
const EXCLUDED_DIRS: &[&str] = &[".git", ".hg", ".svn", ".bzr"];

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
const END_OF_DIRECTORY_SIG: u32 = 0x0605_4b50;
const METHOD_DEFLATE: u16 = 8;
const VERSION_NEEDED: u16 = 20;

/// The files under `root`, as sorted `(slash-relative path, full path)`
/// pairs. Shared by the archive writer and the tree hash so both cover
/// exactly the same file set.
pub(crate) fn tree_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir()
            && EXCLUDED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref()))
    });

    for entry in walker {
        let entry = entry.map_err(|e| Error::Vcs(format!("failed to walk checkout: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Vcs(format!("failed to walk checkout: {e}")))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((rel, entry.path().to_path_buf()));
    }

    files.sort();
    Ok(files)
}

/// Build the module archive for the tree under `root`, with entries named
/// `{prefix}/{relative path}`.
pub fn zip_dir(root: &Path, prefix: &str) -> Result<Vec<u8>> {
    let mut entries = Vec::new();
    for (rel, path) in tree_files(root)? {
        let data = std::fs::read(&path)
            .map_err(|e| Error::Vcs(format!("failed to read {rel}: {e}")))?;
        entries.push((format!("{prefix}/{rel}"), data));
    }
    build_zip(&entries)
}

fn build_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut directory = Vec::new();

    for (name, data) in entries {
        let crc = crc32fast::hash(data);
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(data)
            .map_err(|e| Error::Vcs(format!("failed to compress {name}: {e}")))?;
        let compressed = encoder
            .finish()
            .map_err(|e| Error::Vcs(format!("failed to compress {name}: {e}")))?;

        let offset = out.len() as u32;
        write_local_header(&mut out, name, crc, compressed.len() as u32, data.len() as u32);
        out.extend_from_slice(&compressed);
        write_central_record(
            &mut directory,
            name,
            crc,
            compressed.len() as u32,
            data.len() as u32,
            offset,
        );
    }

    let directory_offset = out.len() as u32;
    out.extend_from_slice(&directory);

    out.extend_from_slice(&END_OF_DIRECTORY_SIG.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // this disk
    out.extend_from_slice(&0u16.to_le_bytes()); // directory disk
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(directory.len() as u32).to_le_bytes());
    out.extend_from_slice(&directory_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length

    Ok(out)
}

fn write_local_header(out: &mut Vec<u8>, name: &str, crc: u32, compressed: u32, original: u32) {
    out.extend_from_slice(&LOCAL_HEADER_SIG.to_le_bytes());
    out.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // general purpose flags
    out.extend_from_slice(&METHOD_DEFLATE.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // modification time
    out.extend_from_slice(&0u16.to_le_bytes()); // modification date
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&compressed.to_le_bytes());
    out.extend_from_slice(&original.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra field length
    out.extend_from_slice(name.as_bytes());
}

fn write_central_record(
    out: &mut Vec<u8>,
    name: &str,
    crc: u32,
    compressed: u32,
    original: u32,
    offset: u32,
) {
    out.extend_from_slice(&CENTRAL_HEADER_SIG.to_le_bytes());
    out.extend_from_slice(&VERSION_NEEDED.to_le_bytes()); // version made by
    out.extend_from_slice(&VERSION_NEEDED.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes()); // general purpose flags
    out.extend_from_slice(&METHOD_DEFLATE.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // modification time
    out.extend_from_slice(&0u16.to_le_bytes()); // modification date
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&compressed.to_le_bytes());
    out.extend_from_slice(&original.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra field length
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number start
    out.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
    out.extend_from_slice(&0u32.to_le_bytes()); // external attributes
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
}
