//! SMIL animation core (host-agnostic)
//!
//! A [`Workplace`] owns every timed element of one document. Each update it
//! advances the document clock, recomputes intervals from begin/end instants,
//! dispatches Begin/Repeat/End events in time order, and composes the animated
//! value of every (target, attribute) pair through its sandwich of animations.
//!
//! Hosts plug in through [`AnimationHost`]; [`MemoryDocument`] is a complete
//! in-memory host used by tests and tools.

pub mod calculator;
pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod host;
pub mod ids;
pub mod inputs;
pub mod instance_list;
pub mod interp;
pub mod interval;
mod motion;
pub mod observer;
pub mod outputs;
pub mod params;
pub mod sandwich;
pub mod schedule;
pub mod time;
pub mod timing;
pub mod workplace;

// Re-exports for hosts and adapters
pub use calculator::{compute_value, CalcCache, ValueMode};
pub use clock::{ClockState, DocumentClock};
pub use config::WorkplaceConfig;
pub use document::{DocumentElement, MemoryDocument};
pub use error::{AnimationError, AnimationResult, ErrorSeverity};
pub use host::{AnimationDecl, AnimationHost, MediaCommand, TimelineKind};
pub use ids::ElementId;
pub use inputs::{AnimationCommand, ElementCommand, Inputs};
pub use interval::{Interval, IntervalPosition};
pub use observer::AnimationObserver;
pub use outputs::{CoreEvent, TimingEvent, UpdateOutcome, ValueChange};
pub use params::{
    Accumulate, Additive, AnimationKind, AnimationParameters, CalcMode, MotionRotate, MotionSpec,
};
pub use sandwich::{AttributeLocation, AttributeType, Sandwich, SandwichKey, SandwichOutput};
pub use schedule::{ActiveState, Schedule, ScheduleEvent};
pub use time::TimeInstant;
pub use timing::{
    DurationDecl, FillMode, RepeatCount, RestartPolicy, SyncEdge, TimeValue, TimingDecl,
    TimingParameters,
};
pub use workplace::Workplace;
pub use smil_value_core::{Value, ValueContext, ValueKind};
