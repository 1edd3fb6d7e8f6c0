//! Error types for queries and sync passes

use thiserror::Error;

/// Result type for HTTP queries
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for sync passes
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure while executing a single HTTP query
///
/// Every lower-layer failure (query builder, auth provider, transport,
/// body read, text decode) is folded into this one type at the
/// [`QueryClient`](crate::http::QueryClient) boundary.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query could not produce a usable address
    #[error("invalid query address: {0:#}")]
    Address(#[source] anyhow::Error),

    /// No auth token could be obtained
    #[error("failed to obtain auth token: {0:#}")]
    Auth(#[source] anyhow::Error),

    /// The transport failed to perform the request
    #[error("request to {url} failed: {source:#}")]
    Transport {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// Reading the response body failed
    #[error("failed to read response body: {0}")]
    Read(#[from] std::io::Error),

    /// The response body was not valid UTF-8
    #[error("response body is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

/// The single failure surfaced from one `sync()` call
#[derive(Debug, Error)]
pub enum SyncError {
    /// A query issued by the protocol body failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The protocol body failed for a domain-specific reason
    #[error("sync protocol failed: {0:#}")]
    Protocol(#[from] anyhow::Error),
}

impl SyncError {
    /// Returns the underlying query error, if this failure came from one
    pub fn as_query(&self) -> Option<&QueryError> {
        match self {
            SyncError::Query(e) => Some(e),
            SyncError::Protocol(_) => None,
        }
    }
}
