//! Core rate limiter implementation.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::clock;
use super::window::{advance, LimiterSettings, WindowEntry};

/// A fixed-window rate limiter with per-identifier state.
///
/// This struct is thread-safe and can be shared across multiple tasks.
/// State is process-local and best-effort: distinct identifiers accumulate
/// entries without bound until they expire and are reclaimed by `cleanup`.
pub struct FixedWindowLimiter {
    /// Settings this instance was built with
    settings: LimiterSettings,
    /// Window entries indexed by composite key
    entries: RwLock<HashMap<String, WindowEntry>>,
}

impl FixedWindowLimiter {
    /// Create a new limiter with the given settings.
    pub fn new(settings: LimiterSettings) -> Self {
        Self {
            settings,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The settings this limiter was built with.
    pub fn settings(&self) -> &LimiterSettings {
        &self.settings
    }

    /// Compose the state key for an identifier.
    ///
    /// Identifiers are opaque; collisions only occur on literal string
    /// equality after prefixing.
    fn key(&self, identifier: &str) -> String {
        format!("{}:{}", self.settings.key_prefix, identifier)
    }

    /// Decide whether one more request for `identifier` may proceed.
    ///
    /// An admission counts against the current window; a denial does not.
    /// This method mutates state and always returns a verdict.
    pub fn is_allowed(&self, identifier: &str) -> bool {
        self.is_allowed_at(identifier, clock::epoch_millis())
    }

    pub(crate) fn is_allowed_at(&self, identifier: &str, now_ms: u64) -> bool {
        let key = self.key(identifier);

        trace!(key = %key, "Checking rate limit");

        // Check-then-act critical section: the lookup and the
        // create-or-increment must happen under one write lock.
        let mut entries = self.entries.write();
        let previous = entries.get(&key).copied();
        let (next, admitted) = advance(previous, now_ms, &self.settings);

        if admitted {
            if previous.is_none() {
                debug!(
                    key = %key,
                    limit = self.settings.max_requests,
                    window_ms = self.settings.window_ms,
                    "Creating new rate limit entry"
                );
            }
            entries.insert(key, next);
        } else {
            debug!(key = %key, "Rate limit exceeded");
        }

        admitted
    }

    /// Quota left for `identifier` in its current window.
    ///
    /// Reports the full ceiling when no window is active. Read-only: a stale
    /// entry is only reclaimed by `cleanup` or overwritten by the next
    /// `is_allowed` call.
    pub fn remaining_requests(&self, identifier: &str) -> u32 {
        self.remaining_requests_at(identifier, clock::epoch_millis())
    }

    pub(crate) fn remaining_requests_at(&self, identifier: &str, now_ms: u64) -> u32 {
        let entries = self.entries.read();
        match entries.get(&self.key(identifier)) {
            Some(entry) if !entry.expired(now_ms) => {
                self.settings.max_requests.saturating_sub(entry.count)
            }
            _ => self.settings.max_requests,
        }
    }

    /// When the active window for `identifier` ends (epoch milliseconds).
    ///
    /// Returns `None` if no entry exists or the window has expired. Read-only.
    pub fn reset_time(&self, identifier: &str) -> Option<u64> {
        self.reset_time_at(identifier, clock::epoch_millis())
    }

    pub(crate) fn reset_time_at(&self, identifier: &str, now_ms: u64) -> Option<u64> {
        let entries = self.entries.read();
        entries
            .get(&self.key(identifier))
            .filter(|entry| !entry.expired(now_ms))
            .map(|entry| entry.reset_at_ms)
    }

    /// Drop every entry whose window has already elapsed.
    ///
    /// Pure garbage collection; never admits or denies. Intended to run
    /// periodically so identifiers that are never queried again do not
    /// accumulate.
    pub fn cleanup(&self) {
        self.cleanup_at(clock::epoch_millis())
    }

    pub(crate) fn cleanup_at(&self, now_ms: u64) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired(now_ms));

        let swept = before - entries.len();
        if swept > 0 {
            debug!(
                prefix = %self.settings.key_prefix,
                swept,
                remaining = entries.len(),
                "Swept expired rate limit entries"
            );
        }
    }

    /// Get the number of live entries.
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Drop all entries.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
