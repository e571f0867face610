//! Crate-wide error type.

use thiserror::Error;

/// Canonical error kinds surfaced by the proxy core.
///
/// Variants are compared by kind, never by message. The enum is `Clone` so
/// a single-flight outcome can be delivered to every waiter of the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The module, version, or a specific artifact is absent from the
    /// relevant source. Served as HTTP 404.
    #[error("module not found")]
    NotFound,

    /// The request path does not match any recognized shape, or a
    /// case-escaped segment failed to decode. Served as HTTP 400.
    #[error("invalid resource: {0}")]
    InvalidResource(String),

    /// The upstream proxy answered with a status other than 200/404/410.
    #[error("request failed with status code {0}")]
    UpstreamStatus(u16),

    /// The upstream proxy could not be reached or the transfer failed.
    #[error("upstream request error: {0}")]
    UpstreamTransport(String),

    /// A version-control subprocess failed; carries its combined output.
    #[error("{0}")]
    Vcs(String),

    /// A module repository failure other than [`Error::NotFound`].
    #[error("storage error: {0}")]
    Storage(String),

    /// The caller went away while the operation was in flight.
    #[error("request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
