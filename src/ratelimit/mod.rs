//! Rate limiting logic and state management.

mod clock;
mod limiter;
mod window;

pub use limiter::FixedWindowLimiter;
pub use window::{advance, LimiterSettings, WindowEntry};
