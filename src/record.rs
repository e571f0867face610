//! Module record and the upstream info JSON model.

use serde::{Deserialize, Serialize};

/// A cached module version, the unit persisted by the module repository.
///
/// `mod_file` is required and non-empty for any stored record. `info`,
/// `zip`, and `zip_hash` may be empty for records imported from legacy
/// on-disk caches; readers treat an empty slot as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Canonical import path, not case-escaped.
    pub name: String,
    /// Canonical version tag, not case-escaped.
    pub version: String,
    /// The `.info` JSON blob as served by the proxy protocol.
    pub info: Vec<u8>,
    /// The build manifest (`go.mod`) bytes.
    pub mod_file: Vec<u8>,
    /// The module source archive.
    pub zip: Vec<u8>,
    /// Content hash of the archive tree (`h1:…`).
    pub zip_hash: String,
}

/// The `.info` document of the module proxy protocol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Time", default)]
    pub time: String,
    #[serde(rename = "Origin", default)]
    pub origin: Origin,
}

/// Provenance of a module version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Origin {
    #[serde(rename = "VCS", default)]
    pub vcs: String,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(rename = "Hash", default)]
    pub hash: String,
    #[serde(rename = "Ref", default)]
    pub reference: String,
}
