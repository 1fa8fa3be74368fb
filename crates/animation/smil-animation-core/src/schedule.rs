//! Schedule: per-element interval computation and boundary commits.
//!
//! A schedule owns the begin/end instance lists of one timed element, its
//! current and previous intervals, and the bookkeeping needed to dispatch
//! Begin/Repeat/End exactly once per interval. Instants that depend on other
//! elements (syncbases) are resolved by the workplace and handed in as
//! [`InstanceSources`]; the schedule itself never looks at other schedules.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::AnimationResult;
use crate::ids::ElementId;
use crate::instance_list::InstanceList;
use crate::interval::{Interval, IntervalPosition};
use crate::time::TimeInstant;
use crate::timing::{FillMode, RestartPolicy, TimeValue, TimingParameters};

/// Which list an injected instant belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceKind {
    Begin,
    End,
}

/// Where an injected instant came from.
///
/// Explicit instants (API calls, host events, access keys) survive a reset;
/// generated ones (reactions to the engine's own timing events) are dropped
/// because replaying the timeline produces them again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceOrigin {
    Explicit,
    Generated,
}

/// Syncbase instants resolved by the workplace for one rebuild.
///
/// `begin`/`end` come from base intervals that may still move and are only
/// used for this rebuild. `settled_begin`/`settled_end` come from base
/// intervals that have finished; the schedule keeps those until reset, since
/// the base stops reporting them once it moves on to later intervals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceSources {
    pub begin: Vec<TimeInstant>,
    pub end: Vec<TimeInstant>,
    pub settled_begin: Vec<TimeInstant>,
    pub settled_end: Vec<TimeInstant>,
}

/// What `update_intervals` changed; any change is propagated to dependents.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IntervalChange {
    pub created: bool,
    pub end_changed: bool,
    pub discarded: bool,
}

impl IntervalChange {
    #[inline]
    pub fn any(&self) -> bool {
        self.created || self.end_changed || self.discarded
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScheduleEvent {
    Begin,
    /// One-based repetition that just started.
    Repeat(u32),
    End,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitOutcome {
    /// Boundary events in dispatch order: the previous interval's end, then
    /// begin, repeats and end of the current one.
    pub events: Vec<(TimeInstant, ScheduleEvent)>,
    /// A new interval became active during this commit.
    pub new_interval: bool,
    /// The active interval ended during this commit.
    pub ended: bool,
}

/// Activity of a schedule at a given document time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ActiveState {
    Active(Interval, IntervalPosition),
    Frozen(Interval, IntervalPosition),
    Inactive,
}

impl ActiveState {
    pub fn position(&self) -> Option<IntervalPosition> {
        match self {
            ActiveState::Active(_, p) | ActiveState::Frozen(_, p) => Some(*p),
            ActiveState::Inactive => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ActiveState::Active(..))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Schedule {
    begin_instances: InstanceList,
    end_instances: InstanceList,
    explicit_begin: InstanceList,
    explicit_end: InstanceList,
    generated_begin: InstanceList,
    generated_end: InstanceList,
    syncbase_begin: InstanceList,
    syncbase_end: InstanceList,
    begin_indefinite: bool,
    end_indefinite: bool,

    current: Option<Interval>,
    previous: Option<Interval>,

    begin_sent: bool,
    end_sent: bool,
    repeats_sent: u32,
    previous_end_pending: bool,
    intervals_begun: u32,

    dirty: bool,
    in_update: bool,
    dependents: Vec<ElementId>,
}

impl Schedule {
    pub fn new(capacity_hint: usize) -> AnimationResult<Self> {
        let mut schedule = Schedule {
            dirty: true,
            ..Schedule::default()
        };
        schedule.begin_instances.reserve(capacity_hint)?;
        schedule.end_instances.reserve(capacity_hint)?;
        Ok(schedule)
    }

    pub fn current(&self) -> Option<&Interval> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Interval> {
        self.previous.as_ref()
    }

    pub fn begin_instances(&self) -> &InstanceList {
        &self.begin_instances
    }

    pub fn end_instances(&self) -> &InstanceList {
        &self.end_instances
    }

    /// True when the begin list holds `indefinite`, i.e. only explicit activation can start it.
    pub fn begin_is_indefinite(&self) -> bool {
        self.begin_indefinite
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Number of intervals that have begun since the last reset.
    pub fn intervals_begun(&self) -> u32 {
        self.intervals_begun
    }

    /// Enter interval computation; returns false if already inside it.
    pub fn try_enter(&mut self) -> bool {
        if self.in_update {
            return false;
        }
        self.in_update = true;
        true
    }

    pub fn leave(&mut self) {
        self.in_update = false;
    }

    pub fn dependents(&self) -> &[ElementId] {
        &self.dependents
    }

    pub fn add_dependent(&mut self, element: ElementId) -> AnimationResult<()> {
        if !self.dependents.contains(&element) {
            self.dependents.try_reserve(1)?;
            self.dependents.push(element);
        }
        Ok(())
    }

    pub fn remove_dependent(&mut self, element: ElementId) {
        self.dependents.retain(|e| *e != element);
    }

    /// Inject an instant (beginElement, events, access keys).
    pub fn add_instance(
        &mut self,
        kind: InstanceKind,
        t: TimeInstant,
        origin: InstanceOrigin,
    ) -> AnimationResult<bool> {
        let list = match (kind, origin) {
            (InstanceKind::Begin, InstanceOrigin::Explicit) => &mut self.explicit_begin,
            (InstanceKind::End, InstanceOrigin::Explicit) => &mut self.explicit_end,
            (InstanceKind::Begin, InstanceOrigin::Generated) => &mut self.generated_begin,
            (InstanceKind::End, InstanceOrigin::Generated) => &mut self.generated_end,
        };
        let added = list.add(t)?;
        if added {
            self.dirty = true;
        }
        Ok(added)
    }

    /// Repopulate the begin/end lists from declared offsets, resolved
    /// syncbases and injected instants, then apply the restart filter.
    pub fn rebuild_instance_lists(
        &mut self,
        timing: &TimingParameters,
        sources: &InstanceSources,
    ) -> AnimationResult<()> {
        self.begin_instances.clear();
        self.end_instances.clear();
        self.begin_indefinite = false;
        self.end_indefinite = false;

        for value in &timing.begin_list {
            match value {
                TimeValue::Offset(ms) => {
                    self.begin_instances.add(TimeInstant::from_ms(*ms))?;
                }
                TimeValue::Indefinite => self.begin_indefinite = true,
                _ => {}
            }
        }
        if timing.begin_list_is_implicit_zero {
            self.begin_instances.add(TimeInstant::ZERO)?;
        }
        self.syncbase_begin.extend(sources.settled_begin.iter().copied())?;
        self.begin_instances.extend(sources.begin.iter().copied())?;
        self.begin_instances.extend(self.syncbase_begin.iter())?;
        self.begin_instances.extend(self.explicit_begin.iter())?;
        self.begin_instances.extend(self.generated_begin.iter())?;

        for value in &timing.end_list {
            match value {
                TimeValue::Offset(ms) => {
                    self.end_instances.add(TimeInstant::from_ms(*ms))?;
                }
                TimeValue::Indefinite => self.end_indefinite = true,
                _ => {}
            }
        }
        self.syncbase_end.extend(sources.settled_end.iter().copied())?;
        self.end_instances.extend(sources.end.iter().copied())?;
        self.end_instances.extend(self.syncbase_end.iter())?;
        self.end_instances.extend(self.explicit_end.iter())?;
        self.end_instances.extend(self.generated_end.iter())?;

        match timing.restart {
            RestartPolicy::Never if self.intervals_begun > 0 => {
                let keep = self.current.map(|c| c.begin);
                self.begin_instances.retain(|t| Some(*t) == keep);
            }
            RestartPolicy::WhenNotActive => {
                if let Some(cur) = self.active_interval() {
                    self.begin_instances
                        .retain(|t| !(cur.begin < *t && (*t < cur.end || !cur.end.is_numeric())));
                }
            }
            _ => {}
        }
        self.dirty = false;
        Ok(())
    }

    /// Current interval if it has begun and not yet ended.
    fn active_interval(&self) -> Option<Interval> {
        self.current.filter(|_| self.begin_sent && !self.end_sent)
    }

    /// Resolve the end of an interval starting at `begin`.
    /// Returns `(end, repeating_duration)` or `None` when no valid end exists.
    ///
    /// An end list that only holds pending conditions still yields an interval
    /// bounded by dur/repeat, so an event end that never fires cannot block
    /// the element from playing.
    fn resolve_end(
        &self,
        timing: &TimingParameters,
        begin: TimeInstant,
    ) -> Option<(TimeInstant, TimeInstant)> {
        // Injected end instants (endElement) apply even without an `end` attribute.
        let end = self.end_instances.first_at_or_after(begin);
        if end.is_numeric() {
            let (active, repeating) = timing.active_duration(begin, Some(end));
            return Some((begin + active, repeating));
        }
        if !timing.has_end_list() || self.end_indefinite || timing.end_has_conditions() {
            // The end will be known once its condition occurs; run on dur/repeat until then.
            let (active, repeating) = timing.active_duration(begin, None);
            return Some((begin + active, repeating));
        }
        None
    }

    /// Compute the next interval whose begin is at or after `lower`.
    fn next_interval(
        &self,
        timing: &TimingParameters,
        lower: TimeInstant,
        first: bool,
        previous_begin: Option<TimeInstant>,
    ) -> Option<Interval> {
        let mut search = lower;
        let mut strict = false;
        // Every retry moves `search` strictly forward over a finite list.
        for _ in 0..=self.begin_instances.len() {
            let begin = if strict {
                self.begin_instances.first_past(search)
            } else {
                self.begin_instances.first_at_or_after(search)
            };
            if !begin.is_numeric() {
                return None;
            }
            if previous_begin == Some(begin) {
                search = begin;
                strict = true;
                continue;
            }
            let Some((end, repeating)) = self.resolve_end(timing, begin) else {
                search = begin;
                strict = true;
                continue;
            };
            // The first interval has to reach past the document begin.
            if first
                && end.is_numeric()
                && (end < TimeInstant::ZERO || (end == TimeInstant::ZERO && begin < end))
            {
                if end > begin {
                    search = end;
                    strict = false;
                } else {
                    search = begin;
                    strict = true;
                }
                continue;
            }
            return Some(Interval {
                begin,
                end,
                repeating_duration: repeating,
                simple_duration: timing.simple_duration,
            });
        }
        None
    }

    /// Bring the current interval up to date for document time `now`.
    ///
    /// `sources` is consulted only when the instance lists are dirty.
    pub fn update_intervals(
        &mut self,
        timing: &TimingParameters,
        sources: &InstanceSources,
        now: TimeInstant,
    ) -> AnimationResult<IntervalChange> {
        let mut change = IntervalChange::default();
        let rebuilt = self.dirty;
        if rebuilt {
            self.rebuild_instance_lists(timing, sources)?;
        }

        if rebuilt {
            if let Some(cur) = self.current {
                if !self.begin_sent && cur.begin > now {
                    self.current = None;
                    change.discarded = true;
                } else if self.begin_sent && !self.end_sent {
                    if let Some((end, repeating)) = self.resolve_end(timing, cur.begin) {
                        if end != cur.end {
                            self.current = Some(Interval {
                                end,
                                repeating_duration: repeating,
                                ..cur
                            });
                            change.end_changed = true;
                        }
                    }
                }
            }
        }

        if timing.restart == RestartPolicy::Always {
            if let Some(cur) = self.active_interval() {
                let next_begin = self.begin_instances.first_past(cur.begin);
                if next_begin.is_numeric() && (next_begin < cur.end || !cur.end.is_numeric()) {
                    self.current = Some(Interval {
                        end: next_begin,
                        ..cur
                    });
                    change.end_changed = true;
                }
            }
        }

        let needs_next = match self.current {
            None => true,
            Some(cur) => self.begin_sent && cur.has_ended_at(now),
        };
        let restart_blocked = timing.restart == RestartPolicy::Never && self.intervals_begun > 0;
        if needs_next && !restart_blocked {
            let (lower, first, previous_begin) = match (self.current, self.previous) {
                (Some(cur), _) => (cur.end, false, Some(cur.begin)),
                (None, Some(prev)) => (prev.end, false, Some(prev.begin)),
                (None, None) => (TimeInstant::EARLIEST, true, None),
            };
            if let Some(next) = self.next_interval(timing, lower, first, previous_begin) {
                debug!(
                    "interval created: [{}, {}) simple={}",
                    next.begin, next.end, next.simple_duration
                );
                if let Some(old) = self.current.take() {
                    self.previous_end_pending = self.begin_sent && !self.end_sent;
                    self.previous = Some(old);
                }
                self.current = Some(next);
                self.begin_sent = false;
                self.end_sent = false;
                self.repeats_sent = 0;
                change.created = true;
            }
        }
        Ok(change)
    }

    /// Emit the boundary events reached by document time `time`.
    pub fn commit_intervals(&mut self, time: TimeInstant) -> CommitOutcome {
        let mut out = CommitOutcome::default();

        if self.previous_end_pending {
            if let Some(prev) = self.previous {
                out.events.push((prev.end, ScheduleEvent::End));
            }
            self.previous_end_pending = false;
        }

        if let Some(cur) = self.current {
            if !self.begin_sent && cur.begin <= time {
                out.events.push((cur.begin, ScheduleEvent::Begin));
                self.begin_sent = true;
                self.intervals_begun = self.intervals_begun.saturating_add(1);
                out.new_interval = true;
            }
            if self.begin_sent && !self.end_sent {
                let ended = cur.has_ended_at(time);
                let horizon = if ended { cur.end } else { time };
                while let Some(t) = cur.repeat_time(self.repeats_sent + 1) {
                    if t > horizon {
                        break;
                    }
                    self.repeats_sent += 1;
                    out.events
                        .push((t, ScheduleEvent::Repeat(self.repeats_sent)));
                }
                if ended {
                    out.events.push((cur.end, ScheduleEvent::End));
                    self.end_sent = true;
                    out.ended = true;
                }
            }
        }

        out
    }

    /// Activity at `time`, honouring `fill` for intervals that have ended.
    pub fn state_at(&self, time: TimeInstant, fill: FillMode) -> ActiveState {
        if let Some(cur) = self.current.filter(|_| self.begin_sent) {
            if !self.end_sent && cur.contains(time) {
                return ActiveState::Active(cur, cur.position_at(time));
            }
            return match fill {
                FillMode::Freeze => ActiveState::Frozen(cur, cur.frozen_position()),
                FillMode::Remove => ActiveState::Inactive,
            };
        }
        match (self.previous, fill) {
            (Some(prev), FillMode::Freeze) if prev.has_ended_at(time) => {
                ActiveState::Frozen(prev, prev.frozen_position())
            }
            _ => ActiveState::Inactive,
        }
    }

    /// Earliest instant `> after` at which this schedule may change state.
    pub fn next_boundary(&self, after: TimeInstant) -> TimeInstant {
        let mut next = TimeInstant::UNRESOLVED;
        if let Some(cur) = self.current {
            if cur.begin > after {
                next = next.min(cur.begin);
            } else if !self.end_sent {
                if let (Some(simple), Some(begin), Some(at)) =
                    (cur.simple_duration.ms(), cur.begin.ms(), after.ms())
                {
                    if simple > 0 {
                        let n = (at - begin) / simple + 1;
                        if let Some(t) = u32::try_from(n).ok().and_then(|n| cur.repeat_time(n)) {
                            next = next.min(t);
                        }
                    }
                }
                if cur.end.is_numeric() && cur.end > after {
                    next = next.min(cur.end);
                }
            }
        }
        let begin = self.begin_instances.first_past(after);
        if begin.is_numeric() {
            next = next.min(begin);
        }
        let end = self.end_instances.first_past(after);
        if end.is_numeric() && self.active_interval().is_some() {
            next = next.min(end);
        }
        next
    }

    /// First known activation time, used for hyperlink navigation.
    pub fn first_known_begin(&self) -> Option<TimeInstant> {
        self.previous
            .or(self.current)
            .map(|iv| iv.begin)
            .or_else(|| self.begin_instances.first())
            .filter(|t| t.is_numeric())
    }

    /// Forget all intervals, generated and syncbase instants; lists are rebuilt on the next update.
    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
        self.begin_sent = false;
        self.end_sent = false;
        self.repeats_sent = 0;
        self.previous_end_pending = false;
        self.intervals_begun = 0;
        self.generated_begin.clear();
        self.generated_end.clear();
        self.syncbase_begin.clear();
        self.syncbase_end.clear();
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{DurationDecl, RepeatCount, TimingDecl};

    fn ms(v: i64) -> TimeInstant {
        TimeInstant::from_ms(v)
    }

    fn timing(decl: TimingDecl) -> TimingParameters {
        TimingParameters::from_decl(&decl)
    }

    fn step(s: &mut Schedule, t: &TimingParameters, now: i64) -> CommitOutcome {
        s.update_intervals(t, &InstanceSources::default(), ms(now)).unwrap();
        s.commit_intervals(ms(now))
    }

    #[test]
    fn repeating_interval_events() {
        let t = timing(TimingDecl {
            dur: DurationDecl::Ms(2000),
            repeat_count: RepeatCount::Count(2.0),
            ..TimingDecl::default()
        });
        let mut s = Schedule::new(4).unwrap();
        let out = step(&mut s, &t, 0);
        assert_eq!(out.events, vec![(ms(0), ScheduleEvent::Begin)]);
        assert!(out.new_interval);
        assert_eq!(s.current().unwrap().end, ms(4000));
        assert_eq!(s.next_boundary(ms(0)), ms(2000));

        let out = step(&mut s, &t, 2000);
        assert_eq!(out.events, vec![(ms(2000), ScheduleEvent::Repeat(1))]);
        assert_eq!(s.next_boundary(ms(2000)), ms(4000));

        let out = step(&mut s, &t, 4000);
        assert_eq!(out.events, vec![(ms(4000), ScheduleEvent::End)]);
        assert!(matches!(s.state_at(ms(5000), FillMode::Freeze), ActiveState::Frozen(..)));
        assert_eq!(s.state_at(ms(5000), FillMode::Remove), ActiveState::Inactive);
    }

    #[test]
    fn restart_never_creates_one_interval() {
        let t = timing(TimingDecl {
            begin: vec![TimeValue::Offset(0), TimeValue::Offset(1500)],
            dur: DurationDecl::Ms(1000),
            restart: RestartPolicy::Never,
            ..TimingDecl::default()
        });
        let mut s = Schedule::new(4).unwrap();
        step(&mut s, &t, 0);
        step(&mut s, &t, 1000);
        s.add_instance(InstanceKind::Begin, ms(1200), InstanceOrigin::Explicit)
            .unwrap();
        for now in [1200, 1500, 2000, 3000] {
            let out = step(&mut s, &t, now);
            assert!(!out.new_interval);
        }
        assert_eq!(s.intervals_begun(), 1);
        assert_eq!(s.current().unwrap().begin, ms(0));
    }

    #[test]
    fn restart_always_cuts_active_interval() {
        let t = timing(TimingDecl {
            dur: DurationDecl::Ms(1000),
            ..TimingDecl::default()
        });
        let mut s = Schedule::new(4).unwrap();
        step(&mut s, &t, 0);
        s.add_instance(InstanceKind::Begin, ms(400), InstanceOrigin::Explicit)
            .unwrap();
        s.update_intervals(&t, &InstanceSources::default(), ms(200))
            .unwrap();
        assert_eq!(s.current().unwrap().end, ms(400));
        let out = step(&mut s, &t, 400);
        assert_eq!(
            out.events,
            vec![(ms(400), ScheduleEvent::End), (ms(400), ScheduleEvent::Begin)]
        );
        assert_eq!(s.current().unwrap().end, ms(1400));
    }

    #[test]
    fn restart_when_not_active_ignores_begins_inside_interval() {
        let t = timing(TimingDecl {
            dur: DurationDecl::Ms(1000),
            restart: RestartPolicy::WhenNotActive,
            ..TimingDecl::default()
        });
        let mut s = Schedule::new(4).unwrap();
        step(&mut s, &t, 0);
        s.add_instance(InstanceKind::Begin, ms(400), InstanceOrigin::Explicit)
            .unwrap();
        step(&mut s, &t, 400);
        assert_eq!(s.current().unwrap().end, ms(1000));
        assert!(!s.begin_instances().contains(ms(400)));
    }

    #[test]
    fn syncbase_sources_feed_begin_list() {
        let t = timing(TimingDecl {
            begin: vec![TimeValue::Syncbase {
                element: "a".into(),
                edge: crate::timing::SyncEdge::End,
                offset: 0,
            }],
            dur: DurationDecl::Ms(500),
            ..TimingDecl::default()
        });
        let mut s = Schedule::new(4).unwrap();
        let change = s
            .update_intervals(&t, &InstanceSources::default(), ms(0))
            .unwrap();
        assert!(!change.created);

        s.mark_dirty();
        let sources = InstanceSources {
            begin: vec![ms(1000)],
            ..InstanceSources::default()
        };
        let change = s.update_intervals(&t, &sources, ms(0)).unwrap();
        assert!(change.created);
        assert_eq!(s.current().unwrap().begin, ms(1000));

        // Moving the syncbase before the interval begins replaces it.
        s.mark_dirty();
        let sources = InstanceSources {
            begin: vec![ms(800)],
            ..InstanceSources::default()
        };
        let change = s.update_intervals(&t, &sources, ms(100)).unwrap();
        assert!(change.discarded && change.created);
        assert_eq!(s.current().unwrap().begin, ms(800));
    }

    #[test]
    fn settled_syncbase_instants_persist_until_reset() {
        let t = timing(TimingDecl {
            begin: vec![TimeValue::Syncbase {
                element: "a".into(),
                edge: crate::timing::SyncEdge::Begin,
                offset: 5000,
            }],
            dur: DurationDecl::Ms(100),
            ..TimingDecl::default()
        });
        let mut s = Schedule::new(4).unwrap();
        let sources = InstanceSources {
            settled_begin: vec![ms(5000)],
            begin: vec![ms(6000)],
            ..InstanceSources::default()
        };
        s.rebuild_instance_lists(&t, &sources).unwrap();
        let sources = InstanceSources {
            settled_begin: vec![ms(6000)],
            begin: vec![ms(7000)],
            ..InstanceSources::default()
        };
        s.rebuild_instance_lists(&t, &sources).unwrap();
        let begins: Vec<_> = s.begin_instances().iter().collect();
        assert_eq!(begins, vec![ms(5000), ms(6000), ms(7000)]);

        s.reset();
        s.rebuild_instance_lists(&t, &InstanceSources::default()).unwrap();
        assert!(s.begin_instances().is_empty());
    }

    #[test]
    fn pending_end_condition_keeps_interval_open() {
        let t = timing(TimingDecl {
            end: vec![TimeValue::Event {
                element: None,
                event: "click".into(),
                offset: 0,
            }],
            ..TimingDecl::default()
        });
        let mut s = Schedule::new(4).unwrap();
        step(&mut s, &t, 0);
        assert_eq!(s.current().unwrap().end, TimeInstant::INDEFINITE);
        s.add_instance(InstanceKind::End, ms(700), InstanceOrigin::Generated)
            .unwrap();
        s.update_intervals(&t, &InstanceSources::default(), ms(500))
            .unwrap();
        assert_eq!(s.current().unwrap().end, ms(700));

        s.reset();
        step(&mut s, &t, 0);
        assert_eq!(s.current().unwrap().end, TimeInstant::INDEFINITE);
    }

    #[test]
    fn negative_begin_is_clipped_by_document_begin() {
        let t = timing(TimingDecl {
            begin: vec![TimeValue::Offset(-3000), TimeValue::Offset(-500)],
            dur: DurationDecl::Ms(1000),
            ..TimingDecl::default()
        });
        let mut s = Schedule::new(4).unwrap();
        step(&mut s, &t, 0);
        let cur = s.current().unwrap();
        assert_eq!(cur.begin, ms(-500));
        let p = s.state_at(ms(0), FillMode::Remove).position().unwrap();
        assert_eq!(p.progress, 0.5);
    }

    #[test]
    fn reentrancy_guard() {
        let mut s = Schedule::new(0).unwrap();
        assert!(s.try_enter());
        assert!(!s.try_enter());
        s.leave();
        assert!(s.try_enter());
    }
}
