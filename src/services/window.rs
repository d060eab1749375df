//! Freshness window for signed requests.

use crate::models::Timestamp;
use crate::services::clock::Clock;

/// Default validity window in seconds
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

/// Maximum accepted age of a signed request
///
/// A request issued at `issued_at` is fresh when
/// `0 <= now - issued_at <= size`, measured in whole seconds. Requests from
/// the future (clock skew) are never fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureWindow {
    size: u64,
}

impl Default for SignatureWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECONDS)
    }
}

impl SignatureWindow {
    pub fn new(size: u64) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Age of `issued_at` relative to `now` in whole seconds; negative when
    /// `issued_at` lies in the future
    pub fn age(issued_at: &Timestamp, now: &Timestamp) -> i128 {
        i128::from(now.unix_seconds()) - i128::from(issued_at.unix_seconds())
    }

    /// Whether `issued_at` is within the window at `now`
    pub fn contains(&self, issued_at: &Timestamp, now: &Timestamp) -> bool {
        let age = Self::age(issued_at, now);
        age >= 0 && age <= i128::from(self.size)
    }

    /// Whether `issued_at` is within the window at the clock's current time
    pub fn is_fresh<C: Clock + ?Sized>(&self, issued_at: &Timestamp, clock: &C) -> bool {
        self.contains(issued_at, &clock.now())
    }
}
