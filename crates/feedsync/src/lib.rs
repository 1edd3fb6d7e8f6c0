//! feedsync - Background sync envelope for feed-reader clients
//!
//! This crate provides the reusable pieces a concrete synchronizer is built on:
//! - A sync state machine guaranteeing at most one running pass per syncer
//! - An advisory "pending" flag for deduplicating schedule requests
//! - An HTTP query façade with auth injection and uniform error wrapping
//! - Response materialization into bytes, streams, or UTF-8 text
//! - Settings and protocol tuning limits shared by sync protocols
//!
//! What gets synced is up to the [`SyncProtocol`] implementation plugged into
//! a [`Syncer`]. This crate never parses or persists payloads itself.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod sync;

pub use auth::{AuthProvider, CachedAuthProvider, StaticToken, TOKEN_FRESHNESS, TokenSource};
pub use config::{NetworkProfile, ReaderSettings, SyncLimits};
pub use error::{QueryError, QueryResult, SyncError, SyncResult};
pub use http::{
    CONTENT_BUFFER_SIZE, ContentStream, Query, QueryClient, QueryDescriptor, Transport,
    UreqTransport, read_to_bytes, read_to_text,
};
pub use sync::{ProgressListener, SyncContext, SyncOutcome, SyncProtocol, Syncer};
