//! Sandwich: priority-ordered composition of every animation writing one
//! (target, attribute) pair.
//!
//! Slices are kept in ascending priority, so a forward scan that feeds each
//! result into the next slice as its base makes the last active slice win.

use log::warn;
use serde::{Deserialize, Serialize};
use smil_value_core::arith::clamp_for_output;
use smil_value_core::{Value, ValueContext};

use crate::calculator::{compute_value, CalcCache};
use crate::error::AnimationResult;
use crate::ids::ElementId;
use crate::observer::AnimationObserver;
use crate::params::AnimationParameters;
use crate::schedule::ActiveState;
use crate::time::TimeInstant;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    #[default]
    Auto,
    Xml,
    Css,
}

/// Attribute (or property) an animation writes to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeLocation {
    pub name: String,
    #[serde(default)]
    pub attribute_type: AttributeType,
}

impl AttributeLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute_type: AttributeType::Auto,
        }
    }
}

/// Identity of a sandwich.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SandwichKey {
    pub target: String,
    pub attribute: AttributeLocation,
}

/// Ordering inputs for one slice.
#[derive(Clone, Debug, PartialEq)]
pub struct SlicePriority {
    /// Begin of the slice's current interval, unresolved until one exists.
    pub begin: TimeInstant,
    pub doc_order: usize,
    /// Elements this one is synchronised to through its begin list.
    pub depends_on: Vec<ElementId>,
}

impl SlicePriority {
    /// Whether `self` is evaluated before `other`.
    ///
    /// Two elements depending on each other with equal begins have no defined
    /// order; whichever check runs first decides.
    fn precedes(&self, self_id: ElementId, other: &SlicePriority, other_id: ElementId) -> bool {
        if self.begin != other.begin {
            return self.begin < other.begin;
        }
        if other.depends_on.contains(&self_id) {
            return true;
        }
        if self.depends_on.contains(&other_id) {
            return false;
        }
        self.doc_order < other.doc_order
    }
}

#[derive(Clone, Debug)]
struct Slice {
    element: ElementId,
    name: String,
    priority: SlicePriority,
    cache: CalcCache,
    disabled: bool,
}

/// What one slice needs from the workplace for a compose pass.
#[derive(Copy, Clone, Debug)]
pub struct SliceInput<'a> {
    pub state: ActiveState,
    pub params: &'a AnimationParameters,
}

/// Result of [`Sandwich::update_value`].
#[derive(Clone, Debug, PartialEq)]
pub enum SandwichOutput {
    Unchanged,
    /// New animated value to write to the overlay slot.
    Changed(Value),
    /// No slice is active any more; the base value shows through.
    Cleared,
}

#[derive(Clone, Debug)]
pub struct Sandwich {
    key: SandwichKey,
    slices: Vec<Slice>,
    last_value: Option<Value>,
}

impl Sandwich {
    pub fn new(key: SandwichKey) -> Self {
        Self {
            key,
            slices: Vec::new(),
            last_value: None,
        }
    }

    pub fn key(&self) -> &SandwichKey {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Element ids in evaluation order (lowest priority first).
    pub fn order(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.slices.iter().map(|s| s.element)
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.slices.iter().any(|s| s.element == element)
    }

    pub fn last_value(&self) -> Option<&Value> {
        self.last_value.as_ref()
    }

    fn position_for(&self, element: ElementId, priority: &SlicePriority) -> usize {
        self.slices
            .iter()
            .position(|s| priority.precedes(element, &s.priority, s.element))
            .unwrap_or(self.slices.len())
    }

    pub fn insert_slice(
        &mut self,
        element: ElementId,
        name: impl Into<String>,
        priority: SlicePriority,
    ) -> AnimationResult<()> {
        if self.contains(element) {
            self.remove_slice(element);
        }
        self.slices.try_reserve(1)?;
        let at = self.position_for(element, &priority);
        self.slices.insert(
            at,
            Slice {
                element,
                name: name.into(),
                priority,
                cache: CalcCache::default(),
                disabled: false,
            },
        );
        Ok(())
    }

    /// Pull a slice out and re-insert it after its begin changed.
    pub fn resort_slice(&mut self, element: ElementId, begin: TimeInstant) {
        let Some(idx) = self.slices.iter().position(|s| s.element == element) else {
            return;
        };
        let mut slice = self.slices.remove(idx);
        slice.priority.begin = begin;
        let at = self.position_for(element, &slice.priority);
        self.slices.insert(at, slice);
    }

    /// Replace the dependency edges used for ordering and re-insert.
    pub fn set_dependencies(&mut self, element: ElementId, depends_on: Vec<ElementId>) {
        let Some(idx) = self.slices.iter().position(|s| s.element == element) else {
            return;
        };
        let mut slice = self.slices.remove(idx);
        slice.priority.depends_on = depends_on;
        let at = self.position_for(element, &slice.priority);
        self.slices.insert(at, slice);
    }

    pub fn remove_slice(&mut self, element: ElementId) -> bool {
        let before = self.slices.len();
        self.slices.retain(|s| s.element != element);
        before != self.slices.len()
    }

    /// Forget the last written value so the next compose reports a change.
    pub fn forget_value(&mut self) {
        self.last_value = None;
    }

    /// Compose the value for this frame.
    ///
    /// `lookup` reports each slice's activity and parameters; slices it
    /// returns `None` for are skipped.
    pub fn update_value<'a, F>(
        &mut self,
        base: &Value,
        ctx: &ValueContext,
        lookup: F,
        mut observer: Option<&mut (dyn AnimationObserver + 'static)>,
    ) -> SandwichOutput
    where
        F: Fn(ElementId) -> Option<SliceInput<'a>>,
    {
        let mut result: Option<Value> = None;
        for slice in self.slices.iter_mut().filter(|s| !s.disabled) {
            let Some(input) = lookup(slice.element) else {
                continue;
            };
            let Some(position) = input.state.position() else {
                continue;
            };
            let below = result.as_ref().unwrap_or(base);
            match compute_value(
                input.params,
                position.progress,
                position.repetition,
                below,
                ctx,
                &mut slice.cache,
            ) {
                Ok(value) => {
                    if let Some(obs) = observer.as_deref_mut() {
                        obs.value_computed(&slice.name, &self.key, &value);
                    }
                    result = Some(value);
                }
                Err(reason) => {
                    warn!(
                        "animation '{}' on {}.{} disabled: {}",
                        slice.name, self.key.target, self.key.attribute.name, reason
                    );
                    slice.disabled = true;
                }
            }
        }

        match result.map(clamp_for_output) {
            Some(value) => {
                if self.last_value.as_ref() == Some(&value) {
                    SandwichOutput::Unchanged
                } else {
                    self.last_value = Some(value.clone());
                    SandwichOutput::Changed(value)
                }
            }
            None => {
                if self.last_value.take().is_some() {
                    SandwichOutput::Cleared
                } else {
                    SandwichOutput::Unchanged
                }
            }
        }
    }
}
