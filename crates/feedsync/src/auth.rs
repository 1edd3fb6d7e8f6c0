//! Auth token acquisition for authenticated queries
//!
//! Queries that require authentication block on an [`AuthProvider`] for a
//! token before the request goes out. [`CachedAuthProvider`] reuses a fetched
//! token for a configurable freshness window and serializes refetches so
//! concurrent syncers never hit the token endpoint at the same time.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Default freshness window for a fetched token
pub const TOKEN_FRESHNESS: Duration = Duration::from_secs(2 * 60);

/// Supplies auth tokens to the query façade
pub trait AuthProvider: Send + Sync {
    /// Block until a token is available or fetching it fails
    fn blocking_token(&self) -> Result<String>;
}

/// Fetches a brand new token from wherever tokens come from
pub trait TokenSource: Send + Sync {
    fn fetch_token(&self) -> Result<String>;
}

impl<F> TokenSource for F
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn fetch_token(&self) -> Result<String> {
        self()
    }
}

/// A fixed token, e.g. one read from settings
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn fetch_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

impl AuthProvider for StaticToken {
    fn blocking_token(&self) -> Result<String> {
        self.fetch_token()
    }
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct CachedToken {
    token: String,
    fetched_at: DateTime<Utc>,
}

/// Caches tokens from a [`TokenSource`] for a freshness window
pub struct CachedAuthProvider<S> {
    source: S,
    freshness: chrono::Duration,
    clock: Clock,
    cached: Mutex<Option<CachedToken>>,
}

impl<S: TokenSource> CachedAuthProvider<S> {
    /// Create a provider using the default [`TOKEN_FRESHNESS`] window
    pub fn new(source: S) -> Self {
        Self::with_freshness(source, TOKEN_FRESHNESS)
    }

    /// Create a provider with an explicit freshness window
    pub fn with_freshness(source: S, freshness: Duration) -> Self {
        Self {
            source,
            freshness: chrono::Duration::from_std(freshness).unwrap_or(chrono::Duration::MAX),
            clock: Box::new(Utc::now),
            cached: Mutex::new(None),
        }
    }

    /// Replace the wall clock used to age tokens
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Drop the cached token so the next request refetches
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a token is cached and still inside the freshness window
    pub fn has_fresh_token(&self) -> bool {
        let now = (self.clock)();
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|cached| self.is_fresh(cached, now))
    }

    fn is_fresh(&self, cached: &CachedToken, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(cached.fetched_at) < self.freshness
    }
}

impl<S: TokenSource> AuthProvider for CachedAuthProvider<S> {
    fn blocking_token(&self) -> Result<String> {
        // Held across the fetch so concurrent callers wait for one refresh.
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        let now = (self.clock)();

        if let Some(existing) = cached.as_ref()
            && self.is_fresh(existing, now)
        {
            return Ok(existing.token.clone());
        }

        log::debug!("Fetching new auth token");
        let token = self.source.fetch_token()?;
        *cached = Some(CachedToken {
            token: token.clone(),
            fetched_at: now,
        });
        Ok(token)
    }
}
