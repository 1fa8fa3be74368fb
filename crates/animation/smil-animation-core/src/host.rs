//! Host interface: the element tree, attribute storage, events and clock.

use serde::{Deserialize, Serialize};
use smil_value_core::{Value, ValueContext};

use crate::outputs::TimingEvent;
use crate::params::AnimationParameters;
use crate::sandwich::AttributeLocation;
use crate::timing::TimingDecl;

/// Declarative description of an animation element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationDecl {
    /// Explicit target id; the parent element is used when absent.
    #[serde(default)]
    pub href: Option<String>,
    pub attribute: AttributeLocation,
    #[serde(flatten)]
    pub params: AnimationParameters,
}

/// How a non-animation timed element reacts to its own timing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    #[default]
    Plain,
    /// Sub-document with its own local clock.
    Nested,
    /// Audio/video element driven by play/stop commands.
    Media,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCommand {
    /// Start playback `from_ms` into the media.
    Play { from_ms: i64 },
    Pause,
    Resume,
    Stop,
}

/// Everything the workplace needs from the document that owns it.
pub trait AnimationHost {
    /// Monotonic real-time clock in milliseconds.
    fn now_ms(&self) -> i64;

    /// Timed element ids in document order.
    fn timed_elements(&self) -> Vec<String>;

    fn element_exists(&self, id: &str) -> bool;

    fn parent_of(&self, id: &str) -> Option<String>;

    fn timing_decl(&self, id: &str) -> Option<TimingDecl>;

    /// `None` for timed elements that are not animations.
    fn animation_decl(&self, id: &str) -> Option<AnimationDecl>;

    fn timeline_kind(&self, _id: &str) -> TimelineKind {
        TimelineKind::Plain
    }

    /// Static value of an attribute; `None` when it cannot be read.
    fn base_value(&self, target: &str, attribute: &AttributeLocation) -> Option<Value>;

    fn is_uninitialized(&self, _target: &str, _attribute: &AttributeLocation) -> bool {
        false
    }

    fn set_animated_value(&mut self, target: &str, attribute: &AttributeLocation, value: Value);

    fn clear_animated_value(&mut self, target: &str, attribute: &AttributeLocation);

    fn value_context(&self, _target: &str) -> ValueContext {
        ValueContext::default()
    }

    fn dispatch_event(&mut self, target: &str, event: &TimingEvent);

    fn media_command(&mut self, _element: &str, _command: MediaCommand) {}

    /// Local time of an active nested timeline.
    fn nested_time(&mut self, _element: &str, _local_ms: i64) {}
}
