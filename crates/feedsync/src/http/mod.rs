//! HTTP query layer
//!
//! This module provides:
//! - Query descriptions (address, encoded params, auth requirement)
//! - A transport abstraction with a blocking ureq implementation
//! - The query façade that authenticates and wraps every failure
//! - Response materialization into bytes or UTF-8 text

mod client;
mod content;
mod query;
mod transport;

pub use client::QueryClient;
pub use content::{CONTENT_BUFFER_SIZE, read_to_bytes, read_to_text};
pub use query::{PARAM_SEPARATOR, Query, QueryDescriptor, QueryDescriptorBuilder, request_url};
pub use transport::{ContentStream, Transport, UreqTransport};
