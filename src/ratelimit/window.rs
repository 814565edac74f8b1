//! Fixed-window state and the admission transition.

/// Settings for one limiter instance, immutable after construction.
#[derive(Debug, Clone)]
pub struct LimiterSettings {
    /// Maximum requests admitted per window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Namespace prepended to identifiers when keying state.
    pub key_prefix: String,
}

impl LimiterSettings {
    /// Create settings for a limiter instance.
    pub fn new(max_requests: u32, window_ms: u64, key_prefix: impl Into<String>) -> Self {
        Self {
            max_requests,
            window_ms,
            key_prefix: key_prefix.into(),
        }
    }
}

/// Throttling state for one key within its current fixed window.
///
/// An entry only exists after an admitted request, so `count >= 1` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    /// Requests admitted so far in the current window.
    pub count: u32,
    /// Absolute time (epoch milliseconds) at which this window ends.
    pub reset_at_ms: u64,
}

impl WindowEntry {
    /// Whether this window has elapsed at `now_ms`.
    ///
    /// The boundary instant itself still belongs to the window.
    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms > self.reset_at_ms
    }
}

/// Advance the window state for one key by a single request at `now_ms`.
///
/// Returns the entry to store and whether the request was admitted. A
/// missing or elapsed window is replaced outright with `count = 1`; within
/// an active window the count grows until the ceiling, and a denial leaves
/// the entry untouched (denied requests do not consume quota).
pub fn advance(
    entry: Option<WindowEntry>,
    now_ms: u64,
    settings: &LimiterSettings,
) -> (WindowEntry, bool) {
    match entry {
        Some(current) if !current.expired(now_ms) => {
            if current.count >= settings.max_requests {
                (current, false)
            } else {
                (
                    WindowEntry {
                        count: current.count + 1,
                        reset_at_ms: current.reset_at_ms,
                    },
                    true,
                )
            }
        }
        _ => (
            WindowEntry {
                count: 1,
                reset_at_ms: now_ms + settings.window_ms,
            },
            true,
        ),
    }
}
