//! Document time values in milliseconds with sentinel states.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A point or span on the document clock, in milliseconds.
///
/// Four values are reserved as sentinels. Ordering is the natural integer
/// order, which gives `Earliest < numeric < Latest < Indefinite < Unresolved`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeInstant(i64);

impl TimeInstant {
    pub const EARLIEST: TimeInstant = TimeInstant(i64::MIN);
    pub const LATEST: TimeInstant = TimeInstant(i64::MAX - 2);
    pub const INDEFINITE: TimeInstant = TimeInstant(i64::MAX - 1);
    pub const UNRESOLVED: TimeInstant = TimeInstant(i64::MAX);
    pub const ZERO: TimeInstant = TimeInstant(0);

    const MIN_NUMERIC: i64 = i64::MIN + 1;
    const MAX_NUMERIC: i64 = i64::MAX - 3;

    /// Numeric instant; values outside the numeric range saturate.
    #[inline]
    pub fn from_ms(ms: i64) -> Self {
        TimeInstant(ms.clamp(Self::MIN_NUMERIC, Self::MAX_NUMERIC))
    }

    /// Convert seconds (as written in markup) to an instant, rounding to the millisecond.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() {
            return Self::UNRESOLVED;
        }
        let ms = (secs * 1000.0).round();
        if ms >= Self::MAX_NUMERIC as f64 {
            Self::from_ms(Self::MAX_NUMERIC)
        } else if ms <= Self::MIN_NUMERIC as f64 {
            Self::from_ms(Self::MIN_NUMERIC)
        } else {
            Self::from_ms(ms as i64)
        }
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        (Self::MIN_NUMERIC..=Self::MAX_NUMERIC).contains(&self.0)
    }

    #[inline]
    pub fn is_unresolved(self) -> bool {
        self == Self::UNRESOLVED
    }

    #[inline]
    pub fn is_indefinite(self) -> bool {
        self == Self::INDEFINITE
    }

    /// Anything except `Unresolved`.
    #[inline]
    pub fn is_resolved(self) -> bool {
        self != Self::UNRESOLVED
    }

    /// Milliseconds for numeric instants.
    #[inline]
    pub fn ms(self) -> Option<i64> {
        self.is_numeric().then_some(self.0)
    }

    /// Raw integer, sentinels included; useful only for diagnostics.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Multiply a numeric span by a (possibly fractional) repeat count.
    pub fn scale(self, factor: f64) -> TimeInstant {
        match self.ms() {
            Some(ms) => TimeInstant::from_secs_f64(ms as f64 * factor / 1000.0),
            None => self,
        }
    }
}

impl Default for TimeInstant {
    fn default() -> Self {
        Self::UNRESOLVED
    }
}

impl Add for TimeInstant {
    type Output = TimeInstant;

    /// Sentinels absorb: `Unresolved` wins over everything, then `Indefinite`.
    fn add(self, rhs: TimeInstant) -> TimeInstant {
        match (self.ms(), rhs.ms()) {
            (Some(a), Some(b)) => TimeInstant::from_ms(a.saturating_add(b)),
            _ if self.is_unresolved() || rhs.is_unresolved() => TimeInstant::UNRESOLVED,
            _ if self.is_indefinite() || rhs.is_indefinite() => TimeInstant::INDEFINITE,
            _ => self.max(rhs),
        }
    }
}

impl Sub for TimeInstant {
    type Output = TimeInstant;

    fn sub(self, rhs: TimeInstant) -> TimeInstant {
        match (self.ms(), rhs.ms()) {
            (Some(a), Some(b)) => TimeInstant::from_ms(a.saturating_sub(b)),
            _ if self.is_unresolved() || rhs.is_unresolved() => TimeInstant::UNRESOLVED,
            _ => TimeInstant::INDEFINITE,
        }
    }
}

impl From<i64> for TimeInstant {
    fn from(ms: i64) -> Self {
        TimeInstant::from_ms(ms)
    }
}

impl fmt::Debug for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EARLIEST => f.write_str("Earliest"),
            Self::LATEST => f.write_str("Latest"),
            Self::INDEFINITE => f.write_str("Indefinite"),
            Self::UNRESOLVED => f.write_str("Unresolved"),
            TimeInstant(ms) => write!(f, "{ms}ms"),
        }
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
