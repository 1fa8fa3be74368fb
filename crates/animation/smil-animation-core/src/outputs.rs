//! Output contracts from the workplace.
//!
//! Outputs carry the attribute values written this update, keyed by target
//! and attribute, and a separate list of semantic events. Hosts receive the
//! same information through [`crate::AnimationHost`]; the outcome is a record
//! for callers that drive the workplace directly.

use serde::{Deserialize, Serialize};
use smil_value_core::Value;

use crate::sandwich::AttributeLocation;
use crate::schedule::ScheduleEvent;
use crate::time::TimeInstant;

/// One changed animated value this update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub target: String,
    pub attribute: AttributeLocation,
    /// `None` when the animated overlay was cleared.
    pub value: Option<Value>,
}

/// A Begin/Repeat/End notification for one timed element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingEvent {
    pub element: String,
    pub event: ScheduleEvent,
    /// Document time of the boundary, not of the update that reached it.
    pub time: TimeInstant,
}

impl TimingEvent {
    /// DOM-style event name used by event-based begin/end values.
    pub fn name(&self) -> &'static str {
        match self.event {
            ScheduleEvent::Begin => "beginEvent",
            ScheduleEvent::Repeat(_) => "repeatEvent",
            ScheduleEvent::End => "endEvent",
        }
    }
}

/// Discrete semantic signals emitted during an update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CoreEvent {
    Timing(TimingEvent),
    /// Real time jumped by more than the lag threshold; document time was held.
    ClockReanchored {
        lag_ms: i64,
    },
    /// Boundary stepping hit its per-update budget and jumped to the target.
    StepBudgetExhausted {
        time: TimeInstant,
    },
    Error {
        element: String,
        message: String,
    },
}

/// Outputs returned by `Workplace::update_animations` and seeks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    #[serde(default)]
    pub changes: Vec<ValueChange>,
    #[serde(default)]
    pub events: Vec<CoreEvent>,
    /// Milliseconds of real time until the host should call again.
    #[serde(default)]
    pub next_update_in: Option<i64>,
}

impl UpdateOutcome {
    #[inline]
    pub fn clear(&mut self) {
        self.changes.clear();
        self.events.clear();
        self.next_update_in = None;
    }

    #[inline]
    pub fn push_change(&mut self, change: ValueChange) {
        self.changes.push(change);
    }

    #[inline]
    pub fn push_event(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.events.is_empty()
    }

    /// Timing events in dispatch order.
    pub fn timing_events(&self) -> impl Iterator<Item = &TimingEvent> + '_ {
        self.events.iter().filter_map(|e| match e {
            CoreEvent::Timing(t) => Some(t),
            _ => None,
        })
    }
}
