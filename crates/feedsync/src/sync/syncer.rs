//! Sync state machine
//!
//! A [`Syncer`] owns one protocol, one data store handle, and the flags that
//! keep protocol passes from overlapping:
//! - `running` is claimed with a check-and-set before the body runs and is
//!   released only after the body and `finish` have both returned
//! - `pending` is an advisory "a sync is wanted" hint; the state machine
//!   never clears it on its own
//!
//! Both flags live in one mutex-guarded value so they are always read and
//! written consistently.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use super::progress::ProgressListener;
use crate::config::{NetworkProfile, ReaderSettings, SyncLimits};
use crate::error::SyncResult;
use crate::http::QueryClient;

/// One sync protocol plugged into a [`Syncer`]
///
/// `run` performs the protocol body and may fail. `finish` always runs
/// afterwards, on success and failure alike, and has no way to report an
/// error; anything it needs to surface must be handled inside it.
pub trait SyncProtocol: Send + Sync {
    /// Data store handle the protocol reads and writes
    type Store: Send + Sync;

    fn run(&self, cx: &SyncContext<'_, Self::Store>) -> SyncResult<()>;

    fn finish(&self, cx: &SyncContext<'_, Self::Store>);
}

/// What a `sync()` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The protocol body ran to completion
    Completed,
    /// Another pass was already running; nothing was done
    AlreadyRunning,
}

/// Everything a protocol body gets to work with during one pass
pub struct SyncContext<'a, S> {
    store: &'a S,
    queries: &'a QueryClient,
    settings: &'a ReaderSettings,
    listener: Option<Arc<dyn ProgressListener>>,
}

impl<'a, S> SyncContext<'a, S> {
    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn queries(&self) -> &'a QueryClient {
        self.queries
    }

    /// Whether query addresses should be upgraded to HTTPS
    pub fn https(&self) -> bool {
        self.settings.https
    }

    pub fn network_profile(&self) -> NetworkProfile {
        self.settings.network
    }

    pub fn limits(&self) -> &'a SyncLimits {
        &self.settings.limits
    }

    /// Forward a progress update to the listener, if one is set
    pub fn notify_progress(&self, message: &str, current: usize, max: usize) {
        if let Some(listener) = &self.listener {
            listener.on_progress_changed(message, current, max);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SyncFlags {
    pending: bool,
    running: bool,
}

/// Releases the running flag when dropped, including during unwinding
struct RunningGuard<'a> {
    flags: &'a Mutex<SyncFlags>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running = false;
    }
}

/// Runs a [`SyncProtocol`] with at most one pass in flight at a time
pub struct Syncer<P: SyncProtocol> {
    protocol: P,
    store: P::Store,
    queries: QueryClient,
    settings: ReaderSettings,
    flags: Mutex<SyncFlags>,
    listener: RwLock<Option<Arc<dyn ProgressListener>>>,
    last_sync_at: Mutex<Option<DateTime<Utc>>>,
}

impl<P: SyncProtocol> Syncer<P> {
    /// Create a syncer bound to a data store handle
    ///
    /// # Arguments
    /// * `protocol` - The protocol body and cleanup hooks
    /// * `store` - Data store handle, owned by this syncer
    /// * `queries` - Query façade sharing the process-wide transport and auth
    /// * `settings` - Network profile, HTTPS preference, and batch limits
    pub fn new(
        protocol: P,
        store: P::Store,
        queries: QueryClient,
        settings: ReaderSettings,
    ) -> Self {
        Self {
            protocol,
            store,
            queries,
            settings,
            flags: Mutex::new(SyncFlags::default()),
            listener: RwLock::new(None),
            last_sync_at: Mutex::new(None),
        }
    }

    /// Run one protocol pass unless one is already running
    ///
    /// A call that finds a pass in flight returns
    /// [`SyncOutcome::AlreadyRunning`] without side effects. Otherwise the
    /// body runs, then `finish` runs, then the running flag is released, and
    /// only then is the body's error (if any) returned.
    pub fn sync(&self) -> SyncResult<SyncOutcome> {
        let Some(running) = self.try_enter_running() else {
            log::debug!("Sync already running, skipping");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        let start = Instant::now();
        let cx = self.context();
        let result = self.protocol.run(&cx);
        self.protocol.finish(&cx);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => {
                *self.lock_last_sync() = Some(Utc::now());
                log::info!("Sync complete in {}ms", elapsed_ms);
            }
            Err(e) => log::warn!("Sync failed after {}ms: {}", elapsed_ms, e),
        }

        drop(running);
        result.map(|()| SyncOutcome::Completed)
    }

    /// Whether a sync has been requested and not yet cleared
    pub fn is_pending(&self) -> bool {
        self.lock_flags().pending
    }

    pub fn set_pending(&self, pending: bool) {
        self.lock_flags().pending = pending;
    }

    /// Mark a sync as pending if it isn't already
    ///
    /// Returns `true` only for the caller that flipped the flag, so several
    /// producers can race to schedule a sync and exactly one wins.
    pub fn try_enter_pending(&self) -> bool {
        let mut flags = self.lock_flags();
        if flags.pending {
            false
        } else {
            flags.pending = true;
            true
        }
    }

    /// Whether a protocol pass is currently in flight
    pub fn is_running(&self) -> bool {
        self.lock_flags().running
    }

    /// Install or clear the progress listener
    pub fn set_listener(&self, listener: Option<Arc<dyn ProgressListener>>) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = listener;
    }

    pub fn listener(&self) -> Option<Arc<dyn ProgressListener>> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn network_profile(&self) -> NetworkProfile {
        self.settings.network
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn store(&self) -> &P::Store {
        &self.store
    }

    /// When the last successful pass finished
    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        *self.lock_last_sync()
    }

    fn try_enter_running(&self) -> Option<RunningGuard<'_>> {
        let mut flags = self.lock_flags();
        if flags.running {
            return None;
        }
        flags.running = true;
        Some(RunningGuard { flags: &self.flags })
    }

    fn context(&self) -> SyncContext<'_, P::Store> {
        SyncContext {
            store: &self.store,
            queries: &self.queries,
            settings: &self.settings,
            listener: self.listener(),
        }
    }

    fn lock_flags(&self) -> MutexGuard<'_, SyncFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_last_sync(&self) -> MutexGuard<'_, Option<DateTime<Utc>>> {
        self.last_sync_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
