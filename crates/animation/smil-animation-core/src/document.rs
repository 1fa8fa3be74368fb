//! In-memory document: a ready-made [`AnimationHost`] with a manual clock.
//!
//! Elements, their declarations and static attribute values are loaded from
//! JSON; animated values, dispatched events and media commands are recorded so
//! callers can inspect what the workplace did.

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smil_value_core::{Value, ValueContext};

use crate::error::AnimationResult;
use crate::host::{AnimationDecl, AnimationHost, MediaCommand, TimelineKind};
use crate::outputs::TimingEvent;
use crate::sandwich::AttributeLocation;
use crate::timing::TimingDecl;

/// One element of the document tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentElement {
    pub id: String,
    pub parent: Option<String>,
    /// Present on timed elements only.
    pub timing: Option<TimingDecl>,
    pub animation: Option<AnimationDecl>,
    pub timeline: TimelineKind,
    /// Static attribute values keyed by attribute name.
    pub attributes: IndexMap<String, Value>,
    pub context: Option<ValueContext>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DocumentFile {
    elements: Vec<DocumentElement>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryDocument {
    elements: IndexMap<String, DocumentElement>,
    animated: HashMap<(String, String), Value>,
    uninitialized: HashSet<(String, String)>,
    dispatched: Vec<TimingEvent>,
    media: Vec<(String, MediaCommand)>,
    nested: HashMap<String, i64>,
    clock_ms: i64,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"elements": [...]}`; element order is document order.
    pub fn from_json(json: &str) -> AnimationResult<Self> {
        let file: DocumentFile = serde_json::from_str(json)?;
        let mut doc = Self::new();
        for element in file.elements {
            doc.insert_element(element);
        }
        Ok(doc)
    }

    pub fn insert_element(&mut self, element: DocumentElement) {
        self.elements.insert(element.id.clone(), element);
    }

    pub fn remove_element(&mut self, id: &str) -> Option<DocumentElement> {
        self.elements.shift_remove(id)
    }

    pub fn element(&self, id: &str) -> Option<&DocumentElement> {
        self.elements.get(id)
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut DocumentElement> {
        self.elements.get_mut(id)
    }

    pub fn set_attribute(&mut self, id: &str, name: &str, value: Value) {
        if let Some(el) = self.elements.get_mut(id) {
            el.attributes.insert(name.to_string(), value);
        }
    }

    pub fn set_uninitialized(&mut self, id: &str, name: &str, uninitialized: bool) {
        let key = (id.to_string(), name.to_string());
        if uninitialized {
            self.uninitialized.insert(key);
        } else {
            self.uninitialized.remove(&key);
        }
    }

    pub fn set_clock(&mut self, ms: i64) {
        self.clock_ms = ms;
    }

    pub fn advance_clock(&mut self, ms: i64) {
        self.clock_ms += ms;
    }

    pub fn animated_value(&self, id: &str, name: &str) -> Option<&Value> {
        self.animated.get(&(id.to_string(), name.to_string()))
    }

    /// Animated value if present, otherwise the static one.
    pub fn presented_value(&self, id: &str, name: &str) -> Option<&Value> {
        self.animated_value(id, name)
            .or_else(|| self.elements.get(id)?.attributes.get(name))
    }

    pub fn dispatched(&self) -> &[TimingEvent] {
        &self.dispatched
    }

    pub fn take_dispatched(&mut self) -> Vec<TimingEvent> {
        std::mem::take(&mut self.dispatched)
    }

    pub fn media_commands(&self) -> &[(String, MediaCommand)] {
        &self.media
    }

    pub fn nested_time(&self, id: &str) -> Option<i64> {
        self.nested.get(id).copied()
    }
}

impl AnimationHost for MemoryDocument {
    fn now_ms(&self) -> i64 {
        self.clock_ms
    }

    fn timed_elements(&self) -> Vec<String> {
        self.elements
            .values()
            .filter(|e| e.timing.is_some() || e.animation.is_some())
            .map(|e| e.id.clone())
            .collect()
    }

    fn element_exists(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn parent_of(&self, id: &str) -> Option<String> {
        self.elements.get(id)?.parent.clone()
    }

    fn timing_decl(&self, id: &str) -> Option<TimingDecl> {
        let el = self.elements.get(id)?;
        match (&el.timing, &el.animation) {
            (Some(t), _) => Some(t.clone()),
            (None, Some(_)) => Some(TimingDecl::default()),
            (None, None) => None,
        }
    }

    fn animation_decl(&self, id: &str) -> Option<AnimationDecl> {
        self.elements.get(id)?.animation.clone()
    }

    fn timeline_kind(&self, id: &str) -> TimelineKind {
        self.elements.get(id).map(|e| e.timeline).unwrap_or_default()
    }

    fn base_value(&self, target: &str, attribute: &AttributeLocation) -> Option<Value> {
        self.elements.get(target)?.attributes.get(&attribute.name).cloned()
    }

    fn is_uninitialized(&self, target: &str, attribute: &AttributeLocation) -> bool {
        self.uninitialized
            .contains(&(target.to_string(), attribute.name.clone()))
    }

    fn set_animated_value(&mut self, target: &str, attribute: &AttributeLocation, value: Value) {
        self.animated
            .insert((target.to_string(), attribute.name.clone()), value);
    }

    fn clear_animated_value(&mut self, target: &str, attribute: &AttributeLocation) {
        self.animated
            .remove(&(target.to_string(), attribute.name.clone()));
    }

    fn value_context(&self, target: &str) -> ValueContext {
        self.elements
            .get(target)
            .and_then(|e| e.context.clone())
            .unwrap_or_default()
    }

    fn dispatch_event(&mut self, _target: &str, event: &TimingEvent) {
        self.dispatched.push(event.clone());
    }

    fn media_command(&mut self, element: &str, command: MediaCommand) {
        self.media.push((element.to_string(), command));
    }

    fn nested_time(&mut self, element: &str, local_ms: i64) {
        self.nested.insert(element.to_string(), local_ms);
    }
}
