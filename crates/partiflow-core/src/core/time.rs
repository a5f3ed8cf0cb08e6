use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in animation time, measured in integer ticks.
///
/// Integer ticks avoid rounding drift when converting between frames and
/// seconds; one second of animation is [`TICKS_PER_SECOND`] ticks.
pub type TimePoint = i32;

pub const TICKS_PER_SECOND: TimePoint = 4800;

pub const fn time_negative_infinity() -> TimePoint {
    TimePoint::MIN
}

pub const fn time_positive_infinity() -> TimePoint {
    TimePoint::MAX
}

pub fn time_to_seconds(time: TimePoint) -> f64 {
    time as f64 / TICKS_PER_SECOND as f64
}

pub fn time_from_seconds(seconds: f64) -> TimePoint {
    (seconds * TICKS_PER_SECOND as f64).round() as TimePoint
}

/// A closed interval of animation time over which a computed result stays valid.
///
/// The empty interval is represented by an end point at negative infinity,
/// which keeps `TimeInterval::default()` empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    start: TimePoint,
    end: TimePoint,
}

impl Default for TimeInterval {
    fn default() -> Self {
        Self::empty()
    }
}

impl TimeInterval {
    pub const fn new(start: TimePoint, end: TimePoint) -> Self {
        Self { start, end }
    }

    pub const fn infinite() -> Self {
        Self::new(time_negative_infinity(), time_positive_infinity())
    }

    pub const fn empty() -> Self {
        Self::new(time_negative_infinity(), time_negative_infinity())
    }

    pub const fn instant(time: TimePoint) -> Self {
        Self::new(time, time)
    }

    pub fn start(&self) -> TimePoint {
        self.start
    }

    pub fn end(&self) -> TimePoint {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == time_negative_infinity() || self.start > self.end
    }

    pub fn is_infinite(&self) -> bool {
        self.start == time_negative_infinity() && self.end == time_positive_infinity()
    }

    pub fn contains(&self, time: TimePoint) -> bool {
        !self.is_empty() && self.start <= time && time <= self.end
    }

    /// Shrinks this interval to its overlap with `other`.
    pub fn intersect(&mut self, other: &TimeInterval) {
        if self.is_empty() {
            return;
        }
        if other.is_empty() {
            *self = Self::empty();
            return;
        }
        self.start = self.start.max(other.start);
        self.end = self.end.min(other.end);
        if self.start > self.end {
            *self = Self::empty();
        }
    }

    pub fn intersection(mut self, other: &TimeInterval) -> Self {
        self.intersect(other);
        self
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[empty]");
        }
        let bound = |t: TimePoint| match t {
            t if t == time_negative_infinity() => "-inf".to_string(),
            t if t == time_positive_infinity() => "+inf".to_string(),
            t => t.to_string(),
        };
        write!(f, "[{}, {}]", bound(self.start), bound(self.end))
    }
}
