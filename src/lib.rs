//! astera - caching proxy for the Go module proxy protocol.
//!
//! Serves `/{module}/@v/…` and `/{module}/@latest` requests from a
//! durable SQLite store. On a miss the resolver fetches the module from
//! an upstream proxy or, for import paths matching the `GOPRIVATE`
//! prefix set, clones it from git, persists the record, and re-reads the
//! requested artifact from the store. A process-wide single-flight group
//! collapses concurrent identical requests into one underlying fetch.

pub mod config;
pub mod error;
pub mod record;
pub mod resolver;
pub mod server;
pub mod singleflight;
pub mod store;
pub mod upstream;
pub mod vcs;

pub use error::{Error, Result};
pub use record::{ModuleRecord, Origin, VersionInfo};
