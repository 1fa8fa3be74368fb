use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use smil_animation_core::{
    AnimationError, AnimationObserver, DocumentElement, ErrorSeverity, Interval, MemoryDocument,
    SandwichKey, ScheduleEvent, TimeInstant, Value, Workplace,
};
use smil_test_fixtures::documents;

fn load(name: &str) -> (Workplace, MemoryDocument) {
    let json = documents::json(name).expect("fixture");
    let mut doc = MemoryDocument::from_json(&json).unwrap();
    let mut wp = Workplace::default();
    wp.register_document(&mut doc).unwrap();
    (wp, doc)
}

fn number(doc: &MemoryDocument, id: &str, attr: &str) -> f32 {
    match doc.presented_value(id, attr) {
        Some(Value::Number(v)) => *v,
        other => panic!("{id}.{attr} is not a number: {other:?}"),
    }
}

fn begins(doc: &MemoryDocument, element: &str) -> Vec<i64> {
    doc.dispatched()
        .iter()
        .filter(|e| e.element == element && e.event == ScheduleEvent::Begin)
        .filter_map(|e| e.time.ms())
        .collect()
}

#[test]
fn syncbase_starts_when_its_base_ends() {
    let (mut wp, mut doc) = load("syncbase-chain");
    wp.set_document_time(1250, &mut doc).unwrap();
    assert_eq!(begins(&doc, "second"), vec![1000]);
    // first is frozen at 10, second adds half of its 5
    assert_relative_eq!(number(&doc, "dot", "cx"), 12.5, epsilon = 1e-4);

    wp.set_document_time(1600, &mut doc).unwrap();
    assert_relative_eq!(number(&doc, "dot", "cx"), 15.0, epsilon = 1e-4);
}

#[test]
fn syncbase_instants_survive_later_base_intervals() {
    let mut doc = MemoryDocument::from_json(
        r#"{"elements": [
            {"id": "a", "timing": {"begin": [{"offset": 0}, {"offset": 1000}, {"offset": 2000}],
                                   "dur": {"ms": 100}}},
            {"id": "b", "timing": {"begin": [{"syncbase": {"element": "a", "edge": "begin",
                                                           "offset": 5000}}],
                                   "dur": {"ms": 100}}}
        ]}"#,
    )
    .unwrap();
    let mut wp = Workplace::default();
    wp.register_document(&mut doc).unwrap();
    wp.set_document_time(8000, &mut doc).unwrap();
    assert_eq!(begins(&doc, "a"), vec![0, 1000, 2000]);
    assert_eq!(begins(&doc, "b"), vec![5000, 6000, 7000]);

    // seeking back clears them and the replay rebuilds the same set
    doc.take_dispatched();
    wp.set_document_time(5050, &mut doc).unwrap();
    wp.set_document_time(8000, &mut doc).unwrap();
    assert_eq!(begins(&doc, "b"), vec![6000, 7000]);
}

#[test]
fn cyclic_syncbases_ping_pong_and_terminate() {
    let mut doc = MemoryDocument::from_json(
        r#"{"elements": [
            {"id": "a", "timing": {"begin": [{"syncbase": {"element": "b", "edge": "end"}}],
                                   "dur": {"ms": 100}}},
            {"id": "b", "timing": {"begin": [{"offset": 0},
                                             {"syncbase": {"element": "a", "edge": "end"}}],
                                   "dur": {"ms": 100}}}
        ]}"#,
    )
    .unwrap();
    let mut wp = Workplace::default();
    wp.register_document(&mut doc).unwrap();
    let out = wp.set_document_time(450, &mut doc).unwrap();

    let seen: Vec<_> = out
        .timing_events()
        .map(|e| (e.element.as_str(), e.event, e.time.ms().unwrap_or(-1)))
        .collect();
    assert_eq!(
        &seen[..3],
        &[
            ("b", ScheduleEvent::Begin, 0),
            ("a", ScheduleEvent::Begin, 100),
            ("b", ScheduleEvent::End, 100),
        ]
    );
    assert_eq!(begins(&doc, "b"), vec![0, 200, 400]);
    assert_eq!(begins(&doc, "a"), vec![100, 300]);
    assert_eq!(wp.document_time(), TimeInstant::from_ms(450));
}

#[test]
fn timing_events_feed_event_listeners() {
    let (mut wp, mut doc) = load("syncbase-chain");
    wp.set_document_time(1800, &mut doc).unwrap();
    // second ends at 1500, pulse listens with a 250 ms offset
    assert_eq!(begins(&doc, "pulse"), vec![1750]);
    assert_relative_eq!(number(&doc, "dot", "r"), 3.0);

    wp.set_document_time(1900, &mut doc).unwrap();
    assert!(doc.animated_value("dot", "r").is_none());
    assert_relative_eq!(number(&doc, "dot", "r"), 1.0);
}

#[test]
fn listeners_are_fed_during_silent_replay() {
    let (mut wp, mut doc) = load("syncbase-chain");
    wp.set_document_time(3000, &mut doc).unwrap();
    doc.take_dispatched();

    wp.set_document_time(1800, &mut doc).unwrap();
    assert!(doc.dispatched().is_empty());
    assert_relative_eq!(number(&doc, "dot", "r"), 3.0);
}

#[test]
fn host_events_and_access_keys_begin_elements() {
    let (mut wp, mut doc) = load("interactive");
    wp.set_document_time(100, &mut doc).unwrap();
    assert_eq!(wp.handle_event("button", "click").unwrap(), 2);
    assert_eq!(wp.handle_event("button", "hover").unwrap(), 0);

    wp.set_document_time(500, &mut doc).unwrap();
    assert_eq!(begins(&doc, "fade"), vec![100]);
    assert_eq!(begins(&doc, "once"), vec![100]);
    assert_relative_eq!(number(&doc, "button", "opacity"), 0.6, epsilon = 1e-4);

    // fade is active and only restarts when not active; once never restarts
    wp.handle_event("button", "click").unwrap();
    wp.set_document_time(1500, &mut doc).unwrap();
    assert_eq!(begins(&doc, "fade"), vec![100]);
    assert_eq!(begins(&doc, "once"), vec![100]);

    assert_eq!(wp.handle_access_key('f').unwrap(), 1);
    assert_eq!(wp.handle_access_key('x').unwrap(), 0);
    wp.set_document_time(1600, &mut doc).unwrap();
    assert_eq!(begins(&doc, "fade"), vec![100, 1500]);
    assert_relative_eq!(number(&doc, "button", "opacity"), 0.9, epsilon = 1e-4);
}

#[test]
fn begin_and_end_element_inject_instants() {
    let (mut wp, mut doc) = load("interactive");
    wp.set_document_time(200, &mut doc).unwrap();
    wp.begin_element("fade", 100).unwrap();
    wp.set_document_time(400, &mut doc).unwrap();
    assert_eq!(begins(&doc, "fade"), vec![300]);

    wp.end_element("fade", 0).unwrap();
    let out = wp.set_document_time(450, &mut doc).unwrap();
    let ends: Vec<_> = out
        .timing_events()
        .filter(|e| e.event == ScheduleEvent::End)
        .map(|e| (e.element.as_str(), e.time))
        .collect();
    assert_eq!(ends, vec![("fade", TimeInstant::from_ms(400))]);

    assert!(matches!(
        wp.begin_element("ghost", 0),
        Err(AnimationError::UnknownElement { .. })
    ));
}

#[test]
fn navigation_seeks_to_the_first_begin() {
    let (mut wp, mut doc) = load("syncbase-chain");
    wp.set_document_time(100, &mut doc).unwrap();
    wp.navigate_to_animation("second", &mut doc).unwrap();
    assert_eq!(wp.document_time(), TimeInstant::from_ms(1000));

    // nothing known yet: begin now
    let (mut wp, mut doc) = load("interactive");
    wp.set_document_time(100, &mut doc).unwrap();
    wp.navigate_to_animation("fade", &mut doc).unwrap();
    wp.set_document_time(150, &mut doc).unwrap();
    assert_eq!(begins(&doc, "fade"), vec![100]);
}

#[test]
fn unregistering_a_syncbase_degrades_its_dependents() {
    let (mut wp, mut doc) = load("syncbase-chain");
    assert_eq!(wp.sandwich_count(), 2);
    wp.set_document_time(1800, &mut doc).unwrap();

    wp.unregister_element("pulse", &mut doc).unwrap();
    assert_eq!(wp.sandwich_count(), 1);
    assert!(doc.animated_value("dot", "r").is_none());

    wp.unregister_element("first", &mut doc).unwrap();
    assert!(wp.element_id("first").is_none());
    assert_eq!(wp.error_severity("second"), Some(ErrorSeverity::TimeValue));
    assert!(wp.diagnostics().iter().any(|e| matches!(
        e,
        AnimationError::UnresolvedDependency { element, .. } if element == "second"
    )));
    assert!(matches!(
        wp.unregister_element("first", &mut doc),
        Err(AnimationError::UnknownElement { .. })
    ));
}

#[test]
fn missing_targets_resolve_after_a_tree_change() {
    let mut doc = MemoryDocument::from_json(
        r#"{"elements": [
            {"id": "late", "timing": {"dur": {"ms": 1000}},
             "animation": {"href": "ghost", "attribute": {"name": "x"},
                           "to": {"type": "Number", "data": 10}}}
        ]}"#,
    )
    .unwrap();
    let mut wp = Workplace::default();
    wp.register_document(&mut doc).unwrap();
    assert_eq!(wp.error_severity("late"), Some(ErrorSeverity::Href));
    assert_eq!(wp.sandwich_count(), 0);

    let mut ghost = DocumentElement {
        id: "ghost".into(),
        ..DocumentElement::default()
    };
    ghost.attributes.insert("x".into(), Value::n(0.0));
    doc.insert_element(ghost);
    wp.handle_tree_change(&mut doc).unwrap();
    assert_eq!(wp.error_severity("late"), None);
    assert_eq!(wp.sandwich_count(), 1);

    wp.set_document_time(500, &mut doc).unwrap();
    assert_relative_eq!(number(&doc, "ghost", "x"), 5.0, epsilon = 1e-4);
}

#[test]
fn invalid_animations_keep_their_timing() {
    let mut doc = MemoryDocument::from_json(
        r#"{"elements": [
            {"id": "rect", "attributes": {"x": {"type": "Number", "data": 1}}},
            {"id": "broken", "parent": "rect", "timing": {"dur": {"ms": 100}},
             "animation": {"attribute": {"name": "x"}}}
        ]}"#,
    )
    .unwrap();
    let mut wp = Workplace::default();
    wp.register_document(&mut doc).unwrap();
    assert!(wp
        .diagnostics()
        .iter()
        .any(|e| matches!(e, AnimationError::InvalidAnimation { .. })));

    let out = wp.set_document_time(50, &mut doc).unwrap();
    assert_eq!(out.timing_events().count(), 1);
    assert!(out.changes.is_empty());
    assert!(doc.animated_value("rect", "x").is_none());
}

#[derive(Default)]
struct Recorder {
    intervals: Vec<(String, Interval)>,
    values: Vec<(String, SandwichKey)>,
}

struct Shared(Rc<RefCell<Recorder>>);

impl AnimationObserver for Shared {
    fn interval_created(&mut self, element: &str, interval: &Interval) {
        self.0
            .borrow_mut()
            .intervals
            .push((element.to_string(), *interval));
    }

    fn value_computed(&mut self, element: &str, key: &SandwichKey, _value: &Value) {
        self.0
            .borrow_mut()
            .values
            .push((element.to_string(), key.clone()));
    }
}

#[test]
fn observer_sees_intervals_and_values() {
    let (mut wp, mut doc) = load("sandwich-priority");
    let log = Rc::new(RefCell::new(Recorder::default()));
    wp.set_observer(Box::new(Shared(log.clone()))).unwrap();
    wp.set_document_time(700, &mut doc).unwrap();

    let log = log.borrow();
    let created: Vec<_> = log.intervals.iter().map(|(e, iv)| (e.as_str(), iv.begin)).collect();
    assert!(created.contains(&("slide", TimeInstant::from_ms(0))));
    assert!(created.contains(&("nudge", TimeInstant::from_ms(500))));
    let order: Vec<_> = log.values.iter().map(|(e, _)| e.as_str()).collect();
    assert_eq!(order, vec!["slide", "nudge"]);
}
