//! One activation window of a timed element.

use serde::{Deserialize, Serialize};

use crate::time::TimeInstant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Always numeric.
    pub begin: TimeInstant,
    /// `>= begin` when numeric; may be `Indefinite` or `Unresolved`.
    pub end: TimeInstant,
    /// Unclamped duration of all repetitions.
    pub repeating_duration: TimeInstant,
    pub simple_duration: TimeInstant,
}

/// Position inside an interval: progress through the current repetition and
/// the zero-based repetition index.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntervalPosition {
    pub progress: f32,
    pub repetition: u32,
}

impl Interval {
    #[inline]
    pub fn active_duration(&self) -> TimeInstant {
        self.end - self.begin
    }

    /// `begin <= t < end`; a non-numeric end never closes the interval.
    #[inline]
    pub fn contains(&self, t: TimeInstant) -> bool {
        self.begin <= t && (t < self.end || !self.end.is_numeric())
    }

    #[inline]
    pub fn has_ended_at(&self, t: TimeInstant) -> bool {
        self.end.is_numeric() && self.end <= t
    }

    fn simple_ms(&self) -> Option<i64> {
        self.simple_duration.ms().filter(|d| *d > 0)
    }

    /// Position at `t` while the interval is active.
    pub fn position_at(&self, t: TimeInstant) -> IntervalPosition {
        let (Some(begin), Some(now)) = (self.begin.ms(), t.ms()) else {
            return IntervalPosition {
                progress: 0.0,
                repetition: 0,
            };
        };
        let elapsed = (now - begin).max(0);
        match self.simple_ms() {
            Some(simple) => IntervalPosition {
                progress: (elapsed % simple) as f32 / simple as f32,
                repetition: u32::try_from(elapsed / simple).unwrap_or(u32::MAX),
            },
            None if self.simple_duration.ms() == Some(0) => IntervalPosition {
                progress: 1.0,
                repetition: 0,
            },
            None => IntervalPosition {
                progress: 0.0,
                repetition: 0,
            },
        }
    }

    /// Position used for a frozen interval: the state at its active end.
    ///
    /// An end on an exact repetition boundary freezes at progress 1.0 of the
    /// previous repetition rather than at 0.0 of the next.
    pub fn frozen_position(&self) -> IntervalPosition {
        let Some(active) = self.active_duration().ms() else {
            return self.position_at(self.begin);
        };
        match self.simple_ms() {
            Some(simple) => {
                let reps = active / simple;
                let rem = active % simple;
                if rem == 0 && reps > 0 {
                    IntervalPosition {
                        progress: 1.0,
                        repetition: u32::try_from(reps - 1).unwrap_or(u32::MAX),
                    }
                } else {
                    IntervalPosition {
                        progress: rem as f32 / simple as f32,
                        repetition: u32::try_from(reps).unwrap_or(u32::MAX),
                    }
                }
            }
            None if self.simple_duration.ms() == Some(0) => IntervalPosition {
                progress: 1.0,
                repetition: 0,
            },
            None => IntervalPosition {
                progress: 0.0,
                repetition: 0,
            },
        }
    }

    /// Start of repetition `n` (n >= 1), if it falls strictly inside the interval.
    pub fn repeat_time(&self, n: u32) -> Option<TimeInstant> {
        let simple = self.simple_ms()?;
        let t = self.begin + TimeInstant::from_ms(simple.saturating_mul(i64::from(n)));
        (t < self.end || !self.end.is_numeric()).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(begin: i64, end: i64, simple: i64) -> Interval {
        Interval {
            begin: TimeInstant::from_ms(begin),
            end: TimeInstant::from_ms(end),
            repeating_duration: TimeInstant::from_ms(end - begin),
            simple_duration: TimeInstant::from_ms(simple),
        }
    }

    #[test]
    fn position_tracks_repetitions() {
        let iv = interval(0, 4000, 2000);
        let p = iv.position_at(TimeInstant::from_ms(1000));
        assert_eq!((p.progress, p.repetition), (0.5, 0));
        let p = iv.position_at(TimeInstant::from_ms(2000));
        assert_eq!((p.progress, p.repetition), (0.0, 1));
        assert!(!iv.contains(TimeInstant::from_ms(4000)));
        assert!(iv.has_ended_at(TimeInstant::from_ms(4000)));
    }

    #[test]
    fn frozen_on_boundary_holds_last_frame() {
        let p = interval(0, 4000, 2000).frozen_position();
        assert_eq!((p.progress, p.repetition), (1.0, 1));
        let p = interval(0, 2500, 1000).frozen_position();
        assert_eq!((p.progress, p.repetition), (0.5, 2));
    }

    #[test]
    fn repeat_times_stop_before_end() {
        let iv = interval(100, 3100, 1000);
        assert_eq!(iv.repeat_time(1), Some(TimeInstant::from_ms(1100)));
        assert_eq!(iv.repeat_time(2), Some(TimeInstant::from_ms(2100)));
        assert_eq!(iv.repeat_time(3), None);
    }
}
