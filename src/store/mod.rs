//! Durable module repository.

pub mod sqlite;

use crate::error::Result;
use crate::record::ModuleRecord;

/// Result of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The `(name, version)` row already existed; the stored bytes were
    /// left untouched.
    AlreadyExists,
}

/// Key-value store over `(name, version)` module records.
///
/// Implementations must be durable across restarts and safe for
/// concurrent readers and writers.
pub trait ModuleRepository: Send + Sync {
    /// Persist a record. Re-inserting an existing key is a no-op reported
    /// as [`InsertOutcome::AlreadyExists`]; callers that only need
    /// idempotence treat both outcomes as success.
    fn insert(&self, record: &ModuleRecord) -> Result<InsertOutcome>;

    /// All versions stored for `name`, in arbitrary order. An unknown
    /// module yields an empty list, not an error.
    fn version_list(&self, name: &str) -> Result<Vec<String>>;

    /// The stored `.info` blob. An absent row, or a row whose info slot is
    /// NULL or empty, is [`crate::Error::NotFound`].
    fn version_info(&self, name: &str, version: &str) -> Result<Vec<u8>>;

    /// The stored `.mod` file, same contract as [`Self::version_info`].
    fn mod_file(&self, name: &str, version: &str) -> Result<Vec<u8>>;

    /// The stored `.zip` archive, same contract as [`Self::version_info`].
    fn module_zip(&self, name: &str, version: &str) -> Result<Vec<u8>>;

    /// Row-level existence check; never reports `NotFound`.
    fn exists(&self, name: &str, version: &str) -> Result<bool>;
}
