//! Diagnostic observer for verification and tooling.

use smil_value_core::Value;

use crate::interval::Interval;
use crate::sandwich::SandwichKey;

/// Receives engine-internal notifications. A workplace accepts at most one.
pub trait AnimationObserver {
    /// A schedule computed a new interval.
    fn interval_created(&mut self, _element: &str, _interval: &Interval) {}

    /// An animation slice produced a value during composition.
    fn value_computed(&mut self, _element: &str, _key: &SandwichKey, _value: &Value) {}
}
