//! Sync lifecycle for reader protocols
//!
//! Provides the [`Syncer`] envelope that runs a [`SyncProtocol`] with
//! at-most-one-pass-in-flight semantics, plus progress reporting.

mod progress;
mod syncer;

pub use progress::ProgressListener;
pub use syncer::{SyncContext, SyncOutcome, SyncProtocol, Syncer};
