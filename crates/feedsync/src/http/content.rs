//! Response body materialization
//!
//! Bodies are read in fixed-size chunks and the source stream is closed on
//! every exit path. A failure to close is logged and never replaces the
//! outcome of the read itself.

use std::io::{ErrorKind, Read};

use super::transport::ContentStream;
use crate::error::QueryResult;

/// Chunk size used when draining a response body
pub const CONTENT_BUFFER_SIZE: usize = 8192;

/// Closes the wrapped stream when dropped
struct CloseGuard<S: ContentStream>(S);

impl<S: ContentStream> Drop for CloseGuard<S> {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            log::warn!("Failed to close response stream: {}", e);
        }
    }
}

/// Drain a stream into a byte buffer, closing it afterwards
pub fn read_to_bytes<S: ContentStream>(stream: S) -> QueryResult<Vec<u8>> {
    let mut guard = CloseGuard(stream);
    let mut content = Vec::new();
    let mut buf = [0u8; CONTENT_BUFFER_SIZE];

    loop {
        match guard.0.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => content.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(content)
}

/// Drain a stream and decode it as UTF-8 text
///
/// The stream is already closed by the time decoding runs, so a decode
/// failure never leaks it.
pub fn read_to_text<S: ContentStream>(stream: S) -> QueryResult<String> {
    let bytes = read_to_bytes(stream)?;
    Ok(String::from_utf8(bytes)?)
}
