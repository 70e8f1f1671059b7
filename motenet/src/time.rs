//! Time types for the motenet protocol.
//!
//! All time values are passed in explicitly, so the core never touches a
//! platform clock and simulations stay deterministic.

use core::ops::{Add, AddAssign, Sub};

/// Protocol timestamp in milliseconds.
///
/// Wraps a u64 to keep milliseconds from being mixed with seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Zero timestamp (epoch).
    pub const ZERO: Timestamp = Timestamp(0);

    /// Maximum timestamp.
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Create a timestamp from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    /// Create a timestamp from seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1000))
    }

    /// Get the timestamp as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the timestamp as seconds (truncated).
    #[inline]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }

    /// Saturating addition of a duration.
    #[inline]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Timestamp(self.0.saturating_add(duration.0))
    }

    /// Saturating subtraction of another timestamp, returning a duration.
    #[inline]
    pub const fn saturating_sub(self, other: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

/// Duration in milliseconds.
///
/// A span of time, not a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration.
    pub const ZERO: Duration = Duration(0);

    /// Create a duration from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Duration(ms)
    }

    /// Create a duration from seconds.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Duration(secs.saturating_mul(1000))
    }

    /// Get the duration as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the duration as seconds (truncated).
    #[inline]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1000
    }
}

impl Add for Duration {
    type Output = Duration;

    #[inline]
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Duration {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let t = Timestamp::from_secs(5);
        assert_eq!(t.as_millis(), 5000);
        assert_eq!(Timestamp::from_millis(1500).as_secs(), 1);

        let d = Duration::from_secs(10);
        assert_eq!(d.as_millis(), 10000);
        assert_eq!(Duration::from_millis(2500).as_secs(), 2);
    }

    #[test]
    fn test_arithmetic() {
        let t1 = Timestamp::from_secs(10);
        let d = Duration::from_secs(5);
        assert_eq!((t1 + d).as_secs(), 15);
        assert_eq!(Timestamp::from_secs(20) - t1, Duration::from_secs(10));

        let mut t2 = t1;
        t2 += d;
        assert_eq!(t2.as_secs(), 15);
    }

    #[test]
    fn test_saturating() {
        let d = Duration::from_secs(1);
        assert_eq!(Timestamp::MAX.saturating_add(d), Timestamp::MAX);
        assert_eq!(
            Timestamp::from_secs(5).saturating_sub(Timestamp::from_secs(10)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_ordering() {
        assert!(Timestamp::from_secs(5) < Timestamp::from_secs(10));
        assert!(Duration::from_secs(3) < Duration::from_secs(7));
    }
}
