//! Declarative timing input and the normalised per-element timing parameters.

use serde::{Deserialize, Serialize};

use crate::time::TimeInstant;

/// Which edge of a syncbase interval a time value is relative to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncEdge {
    Begin,
    End,
}

/// One entry of a `begin` or `end` list. Offsets are in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeValue {
    Offset(i64),
    Syncbase {
        element: String,
        edge: SyncEdge,
        #[serde(default)]
        offset: i64,
    },
    /// `element.event+offset`; a missing element means the default event base.
    Event {
        #[serde(default)]
        element: Option<String>,
        event: String,
        #[serde(default)]
        offset: i64,
    },
    /// `element.repeat(n)+offset`
    Repeat {
        #[serde(default)]
        element: Option<String>,
        iteration: u32,
        #[serde(default)]
        offset: i64,
    },
    AccessKey {
        key: char,
        #[serde(default)]
        offset: i64,
    },
    Indefinite,
}

impl TimeValue {
    /// True for entries whose instants appear only once a condition occurs.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            TimeValue::Syncbase { .. }
                | TimeValue::Event { .. }
                | TimeValue::Repeat { .. }
                | TimeValue::AccessKey { .. }
        )
    }

    pub fn offset(&self) -> i64 {
        match self {
            TimeValue::Offset(ms) => *ms,
            TimeValue::Syncbase { offset, .. }
            | TimeValue::Event { offset, .. }
            | TimeValue::Repeat { offset, .. }
            | TimeValue::AccessKey { offset, .. } => *offset,
            TimeValue::Indefinite => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCount {
    #[default]
    Unspecified,
    Count(f64),
    Indefinite,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    #[default]
    Always,
    WhenNotActive,
    Never,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    #[default]
    Remove,
    Freeze,
}

/// A duration attribute as written: a number of milliseconds, `indefinite`, or absent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DurationDecl {
    #[default]
    Unspecified,
    Ms(i64),
    Indefinite,
}

impl DurationDecl {
    fn to_instant(self, unspecified: TimeInstant) -> TimeInstant {
        match self {
            DurationDecl::Unspecified => unspecified,
            DurationDecl::Ms(ms) if ms >= 0 => TimeInstant::from_ms(ms),
            // Negative durations are invalid and treated as absent.
            DurationDecl::Ms(_) => unspecified,
            DurationDecl::Indefinite => TimeInstant::INDEFINITE,
        }
    }
}

/// Timing attributes of one element as the host describes them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingDecl {
    pub begin: Vec<TimeValue>,
    pub end: Vec<TimeValue>,
    pub dur: DurationDecl,
    pub repeat_count: RepeatCount,
    pub repeat_dur: DurationDecl,
    pub min: DurationDecl,
    pub max: DurationDecl,
    pub restart: RestartPolicy,
    pub fill: FillMode,
}

/// Normalised timing of one element; rebuilt whenever its declaration changes.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingParameters {
    pub begin_list: Vec<TimeValue>,
    pub end_list: Vec<TimeValue>,
    /// `Unresolved` when `dur` is absent.
    pub simple_duration: TimeInstant,
    /// `Unresolved` when `repeatDur` is absent.
    pub repeat_duration: TimeInstant,
    pub repeat_count: RepeatCount,
    pub min_duration: TimeInstant,
    pub max_duration: TimeInstant,
    pub restart: RestartPolicy,
    pub fill: FillMode,
    pub begin_list_is_implicit_zero: bool,
}

impl Default for TimingParameters {
    fn default() -> Self {
        Self::from_decl(&TimingDecl::default())
    }
}

impl TimingParameters {
    pub fn from_decl(decl: &TimingDecl) -> Self {
        let mut min = decl.min.to_instant(TimeInstant::ZERO);
        let mut max = decl.max.to_instant(TimeInstant::INDEFINITE);
        if min.is_indefinite() {
            min = TimeInstant::ZERO;
        }
        // min > max makes both attributes ignored.
        if max.is_numeric() && min > max {
            min = TimeInstant::ZERO;
            max = TimeInstant::INDEFINITE;
        }
        let repeat_count = match decl.repeat_count {
            RepeatCount::Count(n) if !(n > 0.0) || !n.is_finite() => RepeatCount::Unspecified,
            other => other,
        };
        Self {
            begin_list: decl.begin.clone(),
            end_list: decl.end.clone(),
            simple_duration: decl.dur.to_instant(TimeInstant::UNRESOLVED),
            repeat_duration: decl.repeat_dur.to_instant(TimeInstant::UNRESOLVED),
            repeat_count,
            min_duration: min,
            max_duration: max,
            restart: decl.restart,
            fill: decl.fill,
            begin_list_is_implicit_zero: decl.begin.is_empty(),
        }
    }

    pub fn has_end_list(&self) -> bool {
        !self.end_list.is_empty()
    }

    /// True when the `end` list can still gain instants later (events, syncbases, indefinite).
    pub fn end_has_conditions(&self) -> bool {
        self.end_list
            .iter()
            .any(|v| v.is_conditional() || matches!(v, TimeValue::Indefinite))
    }

    /// Length of all repetitions before clamping; `Unresolved` when neither
    /// `dur` nor the repeat attributes give an answer.
    pub fn repeating_duration(&self) -> TimeInstant {
        let dur = self.simple_duration;
        if dur == TimeInstant::ZERO {
            return TimeInstant::ZERO;
        }
        let by_count = match self.repeat_count {
            RepeatCount::Unspecified => TimeInstant::UNRESOLVED,
            RepeatCount::Indefinite => TimeInstant::INDEFINITE,
            RepeatCount::Count(n) if dur.is_numeric() => dur.scale(n),
            RepeatCount::Count(_) => dur,
        };
        let by_dur = self.repeat_duration;
        if matches!(self.repeat_count, RepeatCount::Unspecified) && by_dur.is_unresolved() {
            return dur;
        }
        match (by_count.is_resolved(), by_dur.is_resolved()) {
            (true, true) => by_count.min(by_dur),
            (true, false) => by_count,
            (false, true) => by_dur,
            (false, false) => dur,
        }
    }

    /// Active duration for an interval starting at `begin`, constrained by an
    /// optional resolved `end` instant. Returns `(active, repeating)`.
    pub fn active_duration(&self, begin: TimeInstant, end: Option<TimeInstant>) -> (TimeInstant, TimeInstant) {
        let repeating = self.repeating_duration();
        let only_end = self.simple_duration.is_unresolved()
            && matches!(self.repeat_count, RepeatCount::Unspecified)
            && self.repeat_duration.is_unresolved();
        let mut active = match end {
            Some(end) if end.is_numeric() => {
                let span = end - begin;
                if only_end {
                    span
                } else {
                    repeating.min(span)
                }
            }
            Some(end) if end.is_indefinite() && only_end => TimeInstant::INDEFINITE,
            _ if repeating.is_unresolved() => TimeInstant::INDEFINITE,
            _ => repeating,
        };
        if active > self.max_duration {
            active = self.max_duration;
        }
        if active < self.min_duration {
            active = self.min_duration;
        }
        (active, repeating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: i64) -> TimeInstant {
        TimeInstant::from_ms(v)
    }

    #[test]
    fn repeat_count_multiplies_duration() {
        let decl = TimingDecl {
            dur: DurationDecl::Ms(1000),
            repeat_count: RepeatCount::Count(3.0),
            ..TimingDecl::default()
        };
        let timing = TimingParameters::from_decl(&decl);
        assert_eq!(timing.active_duration(ms(0), None), (ms(3000), ms(3000)));

        let clamped = TimingParameters::from_decl(&TimingDecl {
            max: DurationDecl::Ms(2500),
            ..decl
        });
        assert_eq!(clamped.active_duration(ms(0), None), (ms(2500), ms(3000)));
    }

    #[test]
    fn explicit_end_wins_over_duration() {
        let timing = TimingParameters::from_decl(&TimingDecl {
            dur: DurationDecl::Ms(1000),
            repeat_count: RepeatCount::Indefinite,
            ..TimingDecl::default()
        });
        assert_eq!(timing.active_duration(ms(200), Some(ms(1700))).0, ms(1500));
        assert_eq!(timing.active_duration(ms(0), None).0, TimeInstant::INDEFINITE);
    }

    #[test]
    fn missing_dur_is_indefinite_unless_ended() {
        let timing = TimingParameters::from_decl(&TimingDecl::default());
        assert!(timing.begin_list_is_implicit_zero);
        assert_eq!(timing.active_duration(ms(0), None).0, TimeInstant::INDEFINITE);
        assert_eq!(timing.active_duration(ms(0), Some(ms(800))).0, ms(800));
    }

    #[test]
    fn min_extends_and_inconsistent_bounds_are_dropped() {
        let timing = TimingParameters::from_decl(&TimingDecl {
            dur: DurationDecl::Ms(500),
            min: DurationDecl::Ms(1200),
            ..TimingDecl::default()
        });
        assert_eq!(timing.active_duration(ms(0), None).0, ms(1200));

        let timing = TimingParameters::from_decl(&TimingDecl {
            min: DurationDecl::Ms(2000),
            max: DurationDecl::Ms(1000),
            ..TimingDecl::default()
        });
        assert_eq!(timing.min_duration, TimeInstant::ZERO);
        assert_eq!(timing.max_duration, TimeInstant::INDEFINITE);
    }

    #[test]
    fn decl_from_json() {
        let decl: TimingDecl = serde_json::from_str(
            r#"{
                "begin": [{"offset": 0}, {"syncbase": {"element": "a", "edge": "end", "offset": 250}}],
                "end": [{"event": {"event": "click"}}],
                "dur": {"ms": 2000},
                "repeat_count": {"count": 2.0},
                "fill": "freeze"
            }"#,
        )
        .unwrap();
        assert_eq!(decl.begin.len(), 2);
        assert_eq!(decl.begin[1].offset(), 250);
        assert_eq!(decl.fill, FillMode::Freeze);
        let timing = TimingParameters::from_decl(&decl);
        assert!(timing.end_has_conditions());
    }
}
