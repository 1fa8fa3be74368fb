//! Workplace: document clock, registry of timed elements and the
//! update → commit → compose loop.
//!
//! Methods:
//! - start, pause, suspend, unpause, stop, process_command (clock state machine)
//! - update_animations, set_document_time (stepping and seeking)
//! - register_element, register_document, unregister_element, element_changed,
//!   handle_tree_change (registry)
//! - begin_element, end_element, handle_event, handle_access_key,
//!   navigate_to_animation (instant injection)

use hashbrown::HashMap;
use indexmap::IndexMap;
use log::{debug, trace, warn};

use crate::clock::{ClockState, DocumentClock};
use crate::config::WorkplaceConfig;
use crate::error::{AnimationError, AnimationResult, ErrorSeverity};
use crate::host::{AnimationHost, MediaCommand, TimelineKind};
use crate::ids::{ElementId, IdAllocator};
use crate::inputs::{AnimationCommand, ElementCommand, Inputs};
use crate::observer::AnimationObserver;
use crate::outputs::{CoreEvent, TimingEvent, UpdateOutcome, ValueChange};
use crate::params::AnimationParameters;
use crate::sandwich::{Sandwich, SandwichKey, SandwichOutput, SliceInput, SlicePriority};
use crate::schedule::{
    ActiveState, InstanceKind, InstanceOrigin, InstanceSources, IntervalChange, Schedule,
    ScheduleEvent,
};
use crate::time::TimeInstant;
use crate::timing::{FillMode, SyncEdge, TimeValue, TimingParameters};

/// Update/commit rounds per document time before giving up on convergence.
const SETTLE_ROUNDS: usize = 64;

#[derive(Clone, Debug)]
struct AnimationSlot {
    key: SandwichKey,
    params: AnimationParameters,
    /// Why composition is disabled, if it is.
    invalid: Option<String>,
}

#[derive(Clone, Debug)]
enum NodeRole {
    Animation(AnimationSlot),
    Timeline(TimelineKind),
}

#[derive(Clone, Debug)]
struct TimedNode {
    name: String,
    schedule: Schedule,
    timing: TimingParameters,
    role: NodeRole,
}

impl TimedNode {
    fn animation(&self) -> Option<&AnimationSlot> {
        match &self.role {
            NodeRole::Animation(slot) => Some(slot),
            NodeRole::Timeline(_) => None,
        }
    }

    /// Element whose events an unprefixed event value listens to.
    fn event_base(&self) -> &str {
        match &self.role {
            NodeRole::Animation(slot) => &slot.key.target,
            NodeRole::Timeline(_) => &self.name,
        }
    }

    fn is_kind(&self, kind: TimelineKind) -> bool {
        matches!(self.role, NodeRole::Timeline(k) if k == kind)
    }
}

/// A reference that could not be resolved yet, retried on tree changes.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingError {
    severity: ErrorSeverity,
    reference: String,
}

pub struct Workplace {
    config: WorkplaceConfig,
    ids: IdAllocator,
    /// Document order.
    registry: IndexMap<String, ElementId>,
    /// Arena indexed by `ElementId`; slots of unregistered elements are `None`.
    nodes: Vec<Option<TimedNode>>,
    sandwiches: IndexMap<SandwichKey, Sandwich>,
    clock: DocumentClock,
    started: bool,
    document_time: TimeInstant,
    errors: HashMap<String, PendingError>,
    pending_update: bool,
    observer: Option<Box<dyn AnimationObserver>>,
}

impl Default for Workplace {
    fn default() -> Self {
        Self::new(WorkplaceConfig::default())
    }
}

impl Workplace {
    pub fn new(config: WorkplaceConfig) -> Self {
        let clock = DocumentClock::new(config.playback_rate);
        Self {
            config,
            ids: IdAllocator::new(),
            registry: IndexMap::new(),
            nodes: Vec::new(),
            sandwiches: IndexMap::new(),
            clock,
            started: false,
            document_time: TimeInstant::ZERO,
            errors: HashMap::new(),
            pending_update: false,
            observer: None,
        }
    }

    pub fn config(&self) -> &WorkplaceConfig {
        &self.config
    }

    pub fn document_time(&self) -> TimeInstant {
        self.document_time
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn set_animations_enabled(&mut self, enabled: bool) {
        self.config.animations_enabled = enabled;
        self.pending_update = true;
    }

    pub fn element_id(&self, name: &str) -> Option<ElementId> {
        self.registry.get(name).copied()
    }

    pub fn schedule(&self, name: &str) -> Option<&Schedule> {
        self.element_id(name)
            .and_then(|id| self.node(id))
            .map(|n| &n.schedule)
    }

    pub fn sandwich(&self, key: &SandwichKey) -> Option<&Sandwich> {
        self.sandwiches.get(key)
    }

    pub fn sandwich_count(&self) -> usize {
        self.sandwiches.len()
    }

    /// Severity of the unresolved reference recorded for `name`, if any.
    pub fn error_severity(&self, name: &str) -> Option<ErrorSeverity> {
        self.errors.get(name).map(|e| e.severity)
    }

    /// Recoverable problems currently degrading elements.
    pub fn diagnostics(&self) -> Vec<AnimationError> {
        let mut out: Vec<AnimationError> = self
            .errors
            .iter()
            .map(|(element, e)| AnimationError::UnresolvedDependency {
                element: element.clone(),
                reference: e.reference.clone(),
                severity: e.severity,
            })
            .collect();
        for node in self.nodes.iter().flatten() {
            if let Some(reason) = node.animation().and_then(|s| s.invalid.as_ref()) {
                out.push(AnimationError::invalid(&node.name, reason));
            }
        }
        out
    }

    pub fn set_observer(&mut self, observer: Box<dyn AnimationObserver>) -> AnimationResult<()> {
        if self.observer.is_some() {
            return Err(AnimationError::ObserverAlreadySet);
        }
        self.observer = Some(observer);
        Ok(())
    }

    pub fn clear_observer(&mut self) -> Option<Box<dyn AnimationObserver>> {
        self.observer.take()
    }

    #[inline]
    fn node(&self, id: ElementId) -> Option<&TimedNode> {
        self.nodes.get(id.index())?.as_ref()
    }

    #[inline]
    fn node_mut(&mut self, id: ElementId) -> Option<&mut TimedNode> {
        self.nodes.get_mut(id.index())?.as_mut()
    }

    fn id_of(&self, name: &str) -> AnimationResult<ElementId> {
        self.element_id(name)
            .ok_or_else(|| AnimationError::UnknownElement { id: name.into() })
    }

    fn order(&self) -> Vec<ElementId> {
        self.registry.values().copied().collect()
    }

    // ---- clock state machine ----

    pub fn is_valid_command(&self, command: AnimationCommand) -> bool {
        match command {
            AnimationCommand::Start => !self.started,
            AnimationCommand::Pause => self.started && self.clock.is_tracking(),
            AnimationCommand::Unpause => self.started && !self.clock.is_tracking(),
            AnimationCommand::Stop => self.started,
        }
    }

    fn check(&self, command: AnimationCommand) -> AnimationResult<()> {
        if self.is_valid_command(command) {
            return Ok(());
        }
        let state = match (self.started, self.clock.is_tracking()) {
            (false, _) => "not started",
            (true, true) => "tracking",
            (true, false) => "broken",
        };
        Err(AnimationError::InvalidCommand {
            command: format!("{command:?}"),
            state: state.into(),
        })
    }

    pub fn process_command(
        &mut self,
        command: AnimationCommand,
        host: &mut dyn AnimationHost,
    ) -> AnimationResult<()> {
        match command {
            AnimationCommand::Start => self.start(host),
            AnimationCommand::Pause => self.pause(host),
            AnimationCommand::Unpause => self.unpause(host),
            AnimationCommand::Stop => self.stop(host),
        }
    }

    /// Broken → Tracking from document time zero.
    pub fn start(&mut self, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        self.check(AnimationCommand::Start)?;
        self.reset_timeline();
        self.document_time = TimeInstant::ZERO;
        let now = host.now_ms();
        self.clock.track(now, TimeInstant::ZERO);
        self.started = true;
        self.pending_update = true;
        debug!("clock started at real time {now}");
        Ok(())
    }

    pub fn pause(&mut self, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        self.check(AnimationCommand::Pause)?;
        self.freeze(host);
        Ok(())
    }

    /// Freeze the clock if it is running; never fails.
    pub fn suspend(&mut self, host: &mut dyn AnimationHost) {
        if self.clock.is_tracking() {
            self.freeze(host);
        }
    }

    fn freeze(&mut self, host: &mut dyn AnimationHost) {
        let at = self.clock.freeze(host.now_ms());
        self.pending_update = true;
        self.media_broadcast(host, MediaCommand::Pause);
        debug!("clock frozen at {at}");
    }

    pub fn unpause(&mut self, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        self.check(AnimationCommand::Unpause)?;
        let now = host.now_ms();
        let at = self.clock.time_at(now);
        self.clock.track(now, at);
        self.pending_update = true;
        self.media_broadcast(host, MediaCommand::Resume);
        debug!("clock resumed at {at}");
        Ok(())
    }

    /// Back to document time zero with the clock broken; animated values are cleared.
    pub fn stop(&mut self, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        self.check(AnimationCommand::Stop)?;
        self.media_broadcast(host, MediaCommand::Stop);
        self.reset_timeline();
        self.clock.freeze_at(TimeInstant::ZERO);
        self.document_time = TimeInstant::ZERO;
        self.started = false;
        self.pending_update = false;
        for (key, sandwich) in self.sandwiches.iter_mut() {
            if sandwich.last_value().is_some() {
                host.clear_animated_value(&key.target, &key.attribute);
            }
            sandwich.forget_value();
        }
        debug!("clock stopped");
        Ok(())
    }

    /// Change document milliseconds per real millisecond without a time jump.
    pub fn set_playback_rate(&mut self, rate: f64, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(AnimationError::InvalidCommand {
                command: format!("set_playback_rate({rate})"),
                state: "rate must be positive".into(),
            });
        }
        self.clock.set_rate(host.now_ms(), rate);
        self.config.playback_rate = rate;
        self.pending_update = true;
        Ok(())
    }

    fn media_broadcast(&self, host: &mut dyn AnimationHost, command: MediaCommand) {
        for node in self.nodes.iter().flatten() {
            if node.is_kind(TimelineKind::Media)
                && node
                    .schedule
                    .state_at(self.document_time, FillMode::Remove)
                    .is_active()
            {
                host.media_command(&node.name, command);
            }
        }
    }

    fn reset_timeline(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.schedule.reset();
        }
    }

    // ---- stepping ----

    /// Advance to the clock's current time, dispatching events and writing values.
    pub fn update_animations(&mut self, host: &mut dyn AnimationHost) -> AnimationResult<UpdateOutcome> {
        let mut out = UpdateOutcome::default();
        if !self.pending_update || !self.config.animations_enabled {
            return Ok(out);
        }
        let now = host.now_ms();
        if let Some(lag) = self
            .clock
            .sample(now, self.config.lag_threshold_ms, self.document_time)
        {
            warn!(
                "real time jumped by {lag} ms; holding document time at {}",
                self.document_time
            );
            out.push_event(CoreEvent::ClockReanchored { lag_ms: lag });
        }
        let target = self.clock.time_at(now);
        self.advance_to(target, host, &mut out, true)?;
        self.compose(host, &mut out);
        self.finish_update(&mut out);
        Ok(out)
    }

    fn finish_update(&mut self, out: &mut UpdateOutcome) {
        out.next_update_in = self.next_update_delay();
        self.clock
            .expect_gap(out.next_update_in.unwrap_or(i64::MAX / 2));
        self.pending_update = self.clock.is_tracking();
    }

    /// Seek. Going backward replays the timeline silently up to one
    /// millisecond before `ms` so only the final step dispatches events.
    pub fn set_document_time(
        &mut self,
        ms: i64,
        host: &mut dyn AnimationHost,
    ) -> AnimationResult<UpdateOutcome> {
        let target = TimeInstant::from_ms(ms.max(0));
        let mut out = UpdateOutcome::default();
        if target < self.document_time {
            debug!("seeking backward {} -> {target}", self.document_time);
            self.reset_timeline();
            self.document_time = TimeInstant::ZERO;
            if let Some(silent) = ms.checked_sub(1).filter(|t| *t >= 0) {
                self.advance_to(TimeInstant::from_ms(silent), host, &mut out, false)?;
            }
            self.advance_to(target, host, &mut out, true)?;
            self.media_sync(host);
        } else {
            debug!("seeking forward {} -> {target}", self.document_time);
            self.advance_to(target, host, &mut out, true)?;
        }
        self.clock.reanchor(host.now_ms(), target);
        self.compose(host, &mut out);
        self.finish_update(&mut out);
        Ok(out)
    }

    /// Restart media that is active after a silent replay.
    fn media_sync(&self, host: &mut dyn AnimationHost) {
        for node in self.nodes.iter().flatten() {
            if !node.is_kind(TimelineKind::Media) {
                continue;
            }
            if let ActiveState::Active(iv, _) = node.schedule.state_at(self.document_time, FillMode::Remove) {
                let from_ms = (self.document_time - iv.begin).ms().unwrap_or(0);
                host.media_command(&node.name, MediaCommand::Play { from_ms });
            }
        }
    }

    fn next_boundary(&self) -> TimeInstant {
        self.nodes
            .iter()
            .flatten()
            .map(|n| n.schedule.next_boundary(self.document_time))
            .min()
            .unwrap_or(TimeInstant::UNRESOLVED)
    }

    /// Step through every interval boundary up to `target`.
    fn advance_to(
        &mut self,
        target: TimeInstant,
        host: &mut dyn AnimationHost,
        out: &mut UpdateOutcome,
        dispatch: bool,
    ) -> AnimationResult<()> {
        self.settle(self.document_time, host, out, dispatch)?;
        let mut steps = 0usize;
        while self.document_time < target {
            let next = self.next_boundary();
            if !next.is_numeric() || next > target {
                break;
            }
            if steps >= self.config.max_boundary_steps {
                warn!(
                    "boundary step budget of {} exhausted; jumping to {target}",
                    self.config.max_boundary_steps
                );
                out.push_event(CoreEvent::StepBudgetExhausted { time: target });
                break;
            }
            steps += 1;
            trace!("step to boundary {next}");
            self.document_time = next;
            self.settle(next, host, out, dispatch)?;
        }
        if self.document_time < target {
            self.document_time = target;
            self.settle(target, host, out, dispatch)?;
        }
        Ok(())
    }

    /// Update and commit every schedule at `time` until nothing changes.
    fn settle(
        &mut self,
        time: TimeInstant,
        host: &mut dyn AnimationHost,
        out: &mut UpdateOutcome,
        dispatch: bool,
    ) -> AnimationResult<()> {
        let order = self.order();
        for _ in 0..SETTLE_ROUNDS {
            let mut changed = false;
            for &id in &order {
                changed |= self.update_element(id, time)?.any();
            }

            let mut events: Vec<(ElementId, TimingEvent)> = Vec::new();
            for &id in &order {
                let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::as_mut) else {
                    continue;
                };
                let outcome = node.schedule.commit_intervals(time);
                if outcome.events.is_empty() {
                    continue;
                }
                if outcome.new_interval {
                    let begin = node.schedule.current().map(|c| c.begin);
                    if let (Some(slot), Some(begin)) = (node.animation(), begin) {
                        if let Some(sandwich) = self.sandwiches.get_mut(&slot.key) {
                            sandwich.resort_slice(id, begin);
                        }
                    }
                }
                events.try_reserve(outcome.events.len())?;
                for (t, event) in outcome.events {
                    events.push((
                        id,
                        TimingEvent {
                            element: node.name.clone(),
                            event,
                            time: t,
                        },
                    ));
                }
            }

            if events.is_empty() && !changed {
                return Ok(());
            }
            // Stable: per-element order (end, begin, repeats, end) is kept for equal times.
            events.sort_by_key(|(_, e)| e.time);
            for (id, event) in &events {
                trace!("{} {:?} at {}", event.element, event.event, event.time);
                self.feed_listeners(event)?;
                if dispatch {
                    self.media_reaction(*id, event, time, host);
                    host.dispatch_event(&event.element, event);
                    out.push_event(CoreEvent::Timing(event.clone()));
                }
            }
        }
        warn!("intervals did not settle at {time} after {SETTLE_ROUNDS} rounds");
        Ok(())
    }

    fn media_reaction(&self, id: ElementId, event: &TimingEvent, now: TimeInstant, host: &mut dyn AnimationHost) {
        let Some(node) = self.node(id).filter(|n| n.is_kind(TimelineKind::Media)) else {
            return;
        };
        let command = match event.event {
            ScheduleEvent::Begin => MediaCommand::Play {
                from_ms: (now - event.time).ms().unwrap_or(0).max(0),
            },
            ScheduleEvent::Repeat(_) => MediaCommand::Play { from_ms: 0 },
            ScheduleEvent::End => MediaCommand::Stop,
        };
        host.media_command(&node.name, command);
    }

    /// Recompute one element's interval, then its syncbase dependents.
    ///
    /// A dependent that is already being updated further up the call chain is
    /// skipped, so cyclic syncbases terminate.
    pub fn update_element(&mut self, id: ElementId, time: TimeInstant) -> AnimationResult<IntervalChange> {
        let dirty = match self.node(id) {
            Some(node) => node.schedule.is_dirty(),
            None => return Ok(IntervalChange::default()),
        };
        let sources = if dirty {
            self.resolve_sources(id)
        } else {
            InstanceSources::default()
        };
        let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::as_mut) else {
            return Ok(IntervalChange::default());
        };
        if !node.schedule.try_enter() {
            return Ok(IntervalChange::default());
        }
        let result = node.schedule.update_intervals(&node.timing, &sources, time);
        if let (Ok(change), Some(obs)) = (&result, self.observer.as_deref_mut()) {
            if let (true, Some(iv)) = (change.created, node.schedule.current()) {
                obs.interval_created(&node.name, iv);
            }
        }
        let result = match result {
            Ok(change) if change.any() => self.notify_dependents(id, time).map(|()| change),
            other => other,
        };
        if let Some(node) = self.node_mut(id) {
            node.schedule.leave();
        }
        result
    }

    fn notify_dependents(&mut self, id: ElementId, time: TimeInstant) -> AnimationResult<()> {
        let dependents = match self.node(id) {
            Some(node) => node.schedule.dependents().to_vec(),
            None => return Ok(()),
        };
        for dep in dependents {
            if let Some(node) = self.node_mut(dep) {
                node.schedule.mark_dirty();
            }
            self.update_element(dep, time)?;
        }
        Ok(())
    }

    /// Syncbase instants for `id` from the current state of its syncbases.
    fn resolve_sources(&self, id: ElementId) -> InstanceSources {
        let mut sources = InstanceSources::default();
        let Some(node) = self.node(id) else {
            return sources;
        };
        let lists = [
            (&node.timing.begin_list, &mut sources.begin, &mut sources.settled_begin),
            (&node.timing.end_list, &mut sources.end, &mut sources.settled_end),
        ];
        for (list, live, settled) in lists {
            for value in list {
                let TimeValue::Syncbase {
                    element,
                    edge,
                    offset,
                } = value
                else {
                    continue;
                };
                let Some(base) = self.element_id(element).and_then(|b| self.node(b)) else {
                    continue;
                };
                // A finished interval no longer moves; the current one still can.
                let intervals = [
                    (base.schedule.previous(), &mut *settled),
                    (base.schedule.current(), &mut *live),
                ];
                for (iv, out) in intervals {
                    let Some(iv) = iv else {
                        continue;
                    };
                    let t = match edge {
                        SyncEdge::Begin => iv.begin,
                        SyncEdge::End => iv.end,
                    };
                    if t.is_numeric() {
                        out.push(t + TimeInstant::from_ms(*offset));
                    }
                }
            }
        }
        sources
    }

    /// Add instants to every begin/end list entry accepted by `matches`.
    fn inject_matching<F>(
        &mut self,
        time: TimeInstant,
        origin: InstanceOrigin,
        matches: F,
    ) -> AnimationResult<usize>
    where
        F: Fn(&TimedNode, &TimeValue) -> bool,
    {
        let mut count = 0;
        for node in self.nodes.iter_mut().flatten() {
            let listener: &TimedNode = node;
            let hits: Vec<(InstanceKind, i64)> = listener
                .timing
                .begin_list
                .iter()
                .map(|v| (InstanceKind::Begin, v))
                .chain(listener.timing.end_list.iter().map(|v| (InstanceKind::End, v)))
                .filter(|(_, v)| matches(listener, v))
                .map(|(kind, v)| (kind, v.offset()))
                .collect();
            for (kind, offset) in hits {
                if node
                    .schedule
                    .add_instance(kind, time + TimeInstant::from_ms(offset), origin)?
                {
                    count += 1;
                }
            }
        }
        if count > 0 {
            self.pending_update = true;
        }
        Ok(count)
    }

    /// Feed an engine-dispatched timing event to event and repeat listeners.
    fn feed_listeners(&mut self, source: &TimingEvent) -> AnimationResult<usize> {
        let name = source.name();
        self.inject_matching(source.time, InstanceOrigin::Generated, |node, value| {
            match value {
                TimeValue::Event { element, event, .. } => {
                    event == name && element.as_deref().unwrap_or(node.event_base()) == source.element
                }
                TimeValue::Repeat {
                    element, iteration, ..
                } => {
                    source.event == ScheduleEvent::Repeat(*iteration)
                        && element.as_deref().unwrap_or(node.event_base()) == source.element
                }
                _ => false,
            }
        })
    }

    /// Compose every sandwich and write changed values to the host.
    fn compose(&mut self, host: &mut dyn AnimationHost, out: &mut UpdateOutcome) {
        let time = self.document_time;
        let nodes = &self.nodes;
        let mut observer = self.observer.as_deref_mut();
        for (key, sandwich) in self.sandwiches.iter_mut() {
            if host.is_uninitialized(&key.target, &key.attribute) {
                continue;
            }
            let Some(base) = host.base_value(&key.target, &key.attribute) else {
                continue;
            };
            let ctx = host.value_context(&key.target);
            let lookup = |id: ElementId| {
                let node = nodes.get(id.index())?.as_ref()?;
                match &node.role {
                    NodeRole::Animation(slot) if slot.invalid.is_none() => Some(SliceInput {
                        state: node.schedule.state_at(time, node.timing.fill),
                        params: &slot.params,
                    }),
                    _ => None,
                }
            };
            match sandwich.update_value(&base, &ctx, lookup, observer.as_deref_mut()) {
                SandwichOutput::Changed(value) => {
                    host.set_animated_value(&key.target, &key.attribute, value.clone());
                    out.push_change(ValueChange {
                        target: key.target.clone(),
                        attribute: key.attribute.clone(),
                        value: Some(value),
                    });
                }
                SandwichOutput::Cleared => {
                    host.clear_animated_value(&key.target, &key.attribute);
                    out.push_change(ValueChange {
                        target: key.target.clone(),
                        attribute: key.attribute.clone(),
                        value: None,
                    });
                }
                SandwichOutput::Unchanged => {}
            }
        }

        for node in self.nodes.iter().flatten() {
            if !node.is_kind(TimelineKind::Nested) {
                continue;
            }
            if let ActiveState::Active(iv, _) = node.schedule.state_at(time, FillMode::Remove) {
                if let Some(local) = (time - iv.begin).ms() {
                    host.nested_time(&node.name, local);
                }
            }
        }
    }

    /// Real milliseconds until the next update is useful.
    fn next_update_delay(&self) -> Option<i64> {
        if !self.clock.is_tracking() {
            return None;
        }
        let min = self.config.min_update_interval_ms.max(1);
        // Invalid animations never compose, so only their boundaries matter.
        let animating = self.nodes.iter().flatten().any(|n| {
            let composes = match &n.role {
                NodeRole::Animation(slot) => slot.invalid.is_none(),
                NodeRole::Timeline(kind) => *kind == TimelineKind::Nested,
            };
            composes
                && n.schedule
                    .state_at(self.document_time, FillMode::Remove)
                    .is_active()
        });
        if animating {
            return Some(min);
        }
        let until = (self.next_boundary() - self.document_time).ms()?;
        let real = (until as f64 / self.clock.rate()).ceil() as i64;
        Some(real.max(min))
    }

    // ---- registry ----

    /// Register every timed element of the host document, then retry
    /// references that pointed forward in document order.
    pub fn register_document(&mut self, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        for name in host.timed_elements() {
            self.register_element(&name, host)?;
        }
        self.handle_tree_change(host)
    }

    /// Classify a timed element as an animation or a timeline and start
    /// scheduling it. Unresolvable targets degrade it to a plain timeline.
    pub fn register_element(
        &mut self,
        name: &str,
        host: &mut dyn AnimationHost,
    ) -> AnimationResult<ElementId> {
        if let Some(id) = self.element_id(name) {
            return Ok(id);
        }
        let decl = host
            .timing_decl(name)
            .ok_or_else(|| AnimationError::UnknownElement { id: name.into() })?;
        let schedule = Schedule::new(self.config.instance_capacity_hint)?;
        self.nodes.try_reserve(1)?;
        self.registry
            .try_reserve(1)
            .map_err(|_| AnimationError::exhausted("growing the element registry"))?;

        let id = self.ids.alloc_element();
        debug_assert_eq!(id.index(), self.nodes.len());
        self.nodes.push(Some(TimedNode {
            name: name.to_string(),
            schedule,
            timing: TimingParameters::from_decl(&decl),
            role: NodeRole::Timeline(TimelineKind::Plain),
        }));
        self.registry.insert(name.to_string(), id);
        self.assign_role(id, host)?;
        self.wire_dependencies(id)?;
        self.pending_update = true;
        debug!("registered '{name}' as {id:?}");
        Ok(id)
    }

    /// Resolve the animation target (or timeline kind) and attach the slice.
    fn assign_role(&mut self, id: ElementId, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        self.detach_slice(id, host);
        let Some(name) = self.node(id).map(|n| n.name.clone()) else {
            return Ok(());
        };
        let role = match host.animation_decl(&name) {
            None => NodeRole::Timeline(host.timeline_kind(&name)),
            Some(decl) => {
                let target = match &decl.href {
                    Some(href) => Some(href.clone()).filter(|h| host.element_exists(h)),
                    None => host.parent_of(&name).filter(|p| host.element_exists(p)),
                };
                match target {
                    None => {
                        let reference = decl.href.clone().unwrap_or_else(|| "<parent>".into());
                        warn!("animation '{name}' has no target '{reference}'; running as a plain timeline");
                        self.errors.insert(
                            name.clone(),
                            PendingError {
                                severity: ErrorSeverity::Href,
                                reference,
                            },
                        );
                        NodeRole::Timeline(TimelineKind::Plain)
                    }
                    Some(target) => {
                        if self.error_severity(&name) == Some(ErrorSeverity::Href) {
                            self.errors.remove(&name);
                        }
                        let invalid = decl.params.validate().err();
                        if let Some(reason) = &invalid {
                            warn!("animation '{name}' is invalid: {reason}");
                        }
                        NodeRole::Animation(AnimationSlot {
                            key: SandwichKey {
                                target,
                                attribute: decl.attribute,
                            },
                            params: decl.params,
                            invalid,
                        })
                    }
                }
            }
        };

        if let NodeRole::Animation(slot) = &role {
            if slot.invalid.is_none() {
                let begin = self
                    .node(id)
                    .and_then(|n| n.schedule.current())
                    .map_or(TimeInstant::UNRESOLVED, |c| c.begin);
                let priority = SlicePriority {
                    begin,
                    doc_order: self.registry.get_index_of(&name).unwrap_or(usize::MAX),
                    depends_on: Vec::new(),
                };
                self.sandwiches.try_reserve(1).map_err(|_| {
                    AnimationError::exhausted("growing the sandwich registry")
                })?;
                self.sandwiches
                    .entry(slot.key.clone())
                    .or_insert_with(|| Sandwich::new(slot.key.clone()))
                    .insert_slice(id, name.clone(), priority)?;
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.role = role;
        }
        Ok(())
    }

    /// Remove the element's slice; an emptied sandwich is dropped and its overlay cleared.
    fn detach_slice(&mut self, id: ElementId, host: &mut dyn AnimationHost) {
        let Some(key) = self.node(id).and_then(|n| n.animation()).map(|s| s.key.clone()) else {
            return;
        };
        let Some(sandwich) = self.sandwiches.get_mut(&key) else {
            return;
        };
        sandwich.remove_slice(id);
        if sandwich.is_empty() {
            if sandwich.last_value().is_some() {
                host.clear_animated_value(&key.target, &key.attribute);
            }
            self.sandwiches.shift_remove(&key);
        } else {
            sandwich.forget_value();
        }
        self.pending_update = true;
    }

    /// Hook the element into the schedules it is synchronised to.
    /// Returns false when some reference is not registered yet.
    fn wire_dependencies(&mut self, id: ElementId) -> AnimationResult<bool> {
        let Some(node) = self.node(id) else {
            return Ok(true);
        };
        let name = node.name.clone();
        let mut references: Vec<(String, bool, bool)> = Vec::new();
        for (in_begin, list) in [(true, &node.timing.begin_list), (false, &node.timing.end_list)] {
            for value in list {
                match value {
                    TimeValue::Syncbase { element, .. } => {
                        references.push((element.clone(), in_begin, true));
                    }
                    TimeValue::Repeat {
                        element: Some(element),
                        ..
                    } => references.push((element.clone(), in_begin, false)),
                    _ => {}
                }
            }
        }

        let mut missing = None;
        let mut depends_on = Vec::new();
        for (element, in_begin, syncbase) in references {
            let Some(base) = self.element_id(&element) else {
                warn!("'{name}' refers to unknown timed element '{element}'");
                missing = Some(element);
                continue;
            };
            if syncbase {
                if let Some(base_node) = self.node_mut(base) {
                    base_node.schedule.add_dependent(id)?;
                }
            }
            if in_begin && !depends_on.contains(&base) {
                depends_on.push(base);
            }
        }

        if let Some(key) = self.node(id).and_then(|n| n.animation()).map(|s| s.key.clone()) {
            if let Some(sandwich) = self.sandwiches.get_mut(&key) {
                sandwich.set_dependencies(id, depends_on);
            }
        }

        match missing {
            Some(reference) => {
                // An href problem already forces a full retry.
                if self.error_severity(&name) != Some(ErrorSeverity::Href) {
                    self.errors.insert(
                        name,
                        PendingError {
                            severity: ErrorSeverity::TimeValue,
                            reference,
                        },
                    );
                }
                Ok(false)
            }
            None => {
                if self.error_severity(&name) == Some(ErrorSeverity::TimeValue) {
                    self.errors.remove(&name);
                }
                Ok(true)
            }
        }
    }

    fn unwire(&mut self, id: ElementId) {
        for node in self.nodes.iter_mut().flatten() {
            node.schedule.remove_dependent(id);
        }
    }

    /// Tear down an element: dependency edges first, then its slice.
    pub fn unregister_element(&mut self, name: &str, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        let id = self.id_of(name)?;
        self.unwire(id);
        self.detach_slice(id, host);
        let dependents = self
            .node(id)
            .map(|n| n.schedule.dependents().to_vec())
            .unwrap_or_default();
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = None;
        }
        self.registry.shift_remove(name);
        self.errors.remove(name);
        for dep in dependents {
            if let Some(node) = self.node_mut(dep) {
                node.schedule.mark_dirty();
                let dep_name = node.name.clone();
                self.errors.entry(dep_name).or_insert(PendingError {
                    severity: ErrorSeverity::TimeValue,
                    reference: name.to_string(),
                });
            }
        }
        self.pending_update = true;
        debug!("unregistered '{name}'");
        Ok(())
    }

    /// Re-read an element's declarations after the host changed them.
    pub fn element_changed(&mut self, name: &str, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        let id = self.id_of(name)?;
        let decl = host
            .timing_decl(name)
            .ok_or_else(|| AnimationError::UnknownElement { id: name.into() })?;
        self.unwire(id);
        if let Some(node) = self.node_mut(id) {
            node.timing = TimingParameters::from_decl(&decl);
            node.schedule.mark_dirty();
        }
        self.assign_role(id, host)?;
        self.wire_dependencies(id)?;
        let dependents = self
            .node(id)
            .map(|n| n.schedule.dependents().to_vec())
            .unwrap_or_default();
        for dep in dependents {
            if let Some(node) = self.node_mut(dep) {
                node.schedule.mark_dirty();
            }
        }
        self.pending_update = true;
        Ok(())
    }

    /// Retry unresolved references: href-level first (re-resolve the target),
    /// then time-value level (rewire dependencies).
    pub fn handle_tree_change(&mut self, host: &mut dyn AnimationHost) -> AnimationResult<()> {
        let mut retry: Vec<(ErrorSeverity, String)> = self
            .errors
            .drain()
            .map(|(name, e)| (e.severity, name))
            .collect();
        retry.sort();
        for (severity, name) in retry {
            let Some(id) = self.element_id(&name) else {
                continue;
            };
            if severity == ErrorSeverity::Href {
                self.assign_role(id, host)?;
            }
            self.unwire(id);
            self.wire_dependencies(id)?;
            if let Some(node) = self.node_mut(id) {
                node.schedule.mark_dirty();
            }
        }
        self.pending_update = true;
        Ok(())
    }

    // ---- instant injection ----

    /// `beginElement()`: add a begin instant `offset_ms` after the current time.
    pub fn begin_element(&mut self, name: &str, offset_ms: i64) -> AnimationResult<()> {
        self.inject(name, InstanceKind::Begin, offset_ms)
    }

    /// `endElement()`: add an end instant `offset_ms` after the current time.
    pub fn end_element(&mut self, name: &str, offset_ms: i64) -> AnimationResult<()> {
        self.inject(name, InstanceKind::End, offset_ms)
    }

    fn inject(&mut self, name: &str, kind: InstanceKind, offset_ms: i64) -> AnimationResult<()> {
        let id = self.id_of(name)?;
        let at = self.document_time + TimeInstant::from_ms(offset_ms);
        if let Some(node) = self.node_mut(id) {
            node.schedule.add_instance(kind, at, InstanceOrigin::Explicit)?;
        }
        self.pending_update = true;
        Ok(())
    }

    /// A host event named `event` occurred on `target`. Returns the number of
    /// instants added.
    pub fn handle_event(&mut self, target: &str, event: &str) -> AnimationResult<usize> {
        self.inject_matching(self.document_time, InstanceOrigin::Explicit, |node, value| {
            matches!(value, TimeValue::Event { element, event: name, .. }
                if name == event && element.as_deref().unwrap_or(node.event_base()) == target)
        })
    }

    pub fn handle_access_key(&mut self, key: char) -> AnimationResult<usize> {
        self.inject_matching(self.document_time, InstanceOrigin::Explicit, |_, value| {
            matches!(value, TimeValue::AccessKey { key: k, .. } if *k == key)
        })
    }

    /// Jump to the animation's first known activation, or begin it now if
    /// none is known yet.
    pub fn navigate_to_animation(
        &mut self,
        name: &str,
        host: &mut dyn AnimationHost,
    ) -> AnimationResult<UpdateOutcome> {
        let id = self.id_of(name)?;
        match self.node(id).and_then(|n| n.schedule.first_known_begin()) {
            Some(begin) => self.set_document_time(begin.ms().unwrap_or(0), host),
            None => {
                self.inject(name, InstanceKind::Begin, 0)?;
                Ok(UpdateOutcome::default())
            }
        }
    }

    /// Apply a batch of commands; seeks and navigation contribute their outcomes.
    pub fn apply_inputs(
        &mut self,
        inputs: &Inputs,
        host: &mut dyn AnimationHost,
    ) -> AnimationResult<UpdateOutcome> {
        let mut out = UpdateOutcome::default();
        for command in &inputs.commands {
            self.process_command(*command, host)?;
        }
        for command in &inputs.element_commands {
            let step = match command {
                ElementCommand::Begin { element, offset_ms } => {
                    self.begin_element(element, *offset_ms)?;
                    None
                }
                ElementCommand::End { element, offset_ms } => {
                    self.end_element(element, *offset_ms)?;
                    None
                }
                ElementCommand::AccessKey { key } => {
                    self.handle_access_key(*key)?;
                    None
                }
                ElementCommand::Event { target, name } => {
                    self.handle_event(target, name)?;
                    None
                }
                ElementCommand::Navigate { element } => Some(self.navigate_to_animation(element, host)?),
                ElementCommand::Seek { time_ms } => Some(self.set_document_time(*time_ms, host)?),
            };
            if let Some(step) = step {
                out.changes.extend(step.changes);
                out.events.extend(step.events);
                out.next_update_in = step.next_update_in;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use smil_value_core::Value;

    const DOC: &str = r#"{"elements": [
        {"id": "rect", "attributes": {"x": {"type": "Number", "data": 0}}},
        {"id": "move", "parent": "rect",
         "timing": {"begin": [{"offset": 0}], "dur": {"ms": 1000}, "fill": "freeze"},
         "animation": {"attribute": {"name": "x"},
                       "from": {"type": "Number", "data": 0},
                       "to": {"type": "Number", "data": 10}}}
    ]}"#;

    fn setup() -> (Workplace, MemoryDocument) {
        let mut doc = MemoryDocument::from_json(DOC).unwrap();
        let mut wp = Workplace::default();
        wp.register_document(&mut doc).unwrap();
        (wp, doc)
    }

    #[test]
    fn command_validity_follows_clock_state() {
        let (mut wp, mut doc) = setup();
        assert!(wp.is_valid_command(AnimationCommand::Start));
        assert!(!wp.is_valid_command(AnimationCommand::Pause));
        let err = wp.pause(&mut doc).unwrap_err();
        assert_eq!(err.category(), "command");

        wp.process_command(AnimationCommand::Start, &mut doc).unwrap();
        assert!(wp.is_valid_command(AnimationCommand::Pause));
        assert!(!wp.is_valid_command(AnimationCommand::Unpause));
        wp.pause(&mut doc).unwrap();
        assert!(matches!(wp.clock_state(), ClockState::Broken { .. }));
        wp.unpause(&mut doc).unwrap();
        wp.stop(&mut doc).unwrap();
        assert!(!wp.is_started());
        assert_eq!(wp.document_time(), TimeInstant::ZERO);
    }

    #[test]
    fn updates_follow_the_host_clock() {
        let (mut wp, mut doc) = setup();
        wp.start(&mut doc).unwrap();
        let out = wp.update_animations(&mut doc).unwrap();
        assert_eq!(out.timing_events().count(), 1);
        assert_eq!(doc.presented_value("rect", "x"), Some(&Value::n(0.0)));

        doc.advance_clock(500);
        wp.update_animations(&mut doc).unwrap();
        assert_eq!(doc.presented_value("rect", "x"), Some(&Value::n(5.0)));

        doc.advance_clock(600);
        let out = wp.update_animations(&mut doc).unwrap();
        let ends: Vec<_> = out.timing_events().map(|e| (e.event, e.time)).collect();
        assert_eq!(ends, vec![(ScheduleEvent::End, TimeInstant::from_ms(1000))]);
        assert_eq!(doc.presented_value("rect", "x"), Some(&Value::n(10.0)));
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let (mut wp, mut doc) = setup();
        wp.start(&mut doc).unwrap();
        wp.update_animations(&mut doc).unwrap();
        doc.advance_clock(200);
        wp.pause(&mut doc).unwrap();
        doc.advance_clock(500);
        wp.update_animations(&mut doc).unwrap();
        assert_eq!(wp.document_time(), TimeInstant::from_ms(200));
        assert_eq!(wp.update_animations(&mut doc).unwrap(), UpdateOutcome::default());
        wp.unpause(&mut doc).unwrap();
        doc.advance_clock(100);
        wp.update_animations(&mut doc).unwrap();
        assert_eq!(wp.document_time(), TimeInstant::from_ms(300));
    }

    #[test]
    fn observer_is_exclusive() {
        struct Quiet;
        impl AnimationObserver for Quiet {}
        let mut wp = Workplace::default();
        wp.set_observer(Box::new(Quiet)).unwrap();
        assert_eq!(
            wp.set_observer(Box::new(Quiet)).unwrap_err(),
            AnimationError::ObserverAlreadySet
        );
        assert!(wp.clear_observer().is_some());
        assert!(wp.set_observer(Box::new(Quiet)).is_ok());
    }

    #[test]
    fn playback_rate_rejects_nonsense() {
        let (mut wp, mut doc) = setup();
        assert!(wp.set_playback_rate(0.0, &mut doc).is_err());
        assert!(wp.set_playback_rate(f64::NAN, &mut doc).is_err());
        wp.start(&mut doc).unwrap();
        wp.set_playback_rate(2.0, &mut doc).unwrap();
        doc.advance_clock(100);
        wp.update_animations(&mut doc).unwrap();
        assert_eq!(wp.document_time(), TimeInstant::from_ms(200));
    }
}
