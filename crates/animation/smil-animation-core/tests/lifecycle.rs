use smil_animation_core::{
    AnimationCommand, CoreEvent, Inputs, MediaCommand, MemoryDocument, TimeInstant, Value,
    Workplace, WorkplaceConfig,
};
use smil_test_fixtures::documents;

fn load_with(name: &str, config: WorkplaceConfig) -> (Workplace, MemoryDocument) {
    let json = documents::json(name).expect("fixture");
    let mut doc = MemoryDocument::from_json(&json).unwrap();
    let mut wp = Workplace::new(config);
    wp.register_document(&mut doc).unwrap();
    (wp, doc)
}

fn load(name: &str) -> (Workplace, MemoryDocument) {
    load_with(name, WorkplaceConfig::default())
}

#[test]
fn inputs_drive_commands_and_seeks() {
    let (mut wp, mut doc) = load("repeat-freeze");
    let inputs: Inputs = serde_json::from_str(
        r#"{
            "commands": ["start"],
            "element_commands": [{"seek": {"time_ms": 1000}}]
        }"#,
    )
    .unwrap();
    let out = wp.apply_inputs(&inputs, &mut doc).unwrap();
    assert!(wp.is_started());
    assert_eq!(wp.document_time(), TimeInstant::from_ms(1000));
    assert_eq!(out.changes.len(), 1);
    assert_eq!(doc.presented_value("bar", "width"), Some(&Value::n(50.0)));

    // start is not valid twice
    let again = Inputs {
        commands: vec![AnimationCommand::Start],
        ..Inputs::default()
    };
    let err = wp.apply_inputs(&again, &mut doc).unwrap_err();
    assert_eq!(err.category(), "command");
    assert!(err.is_recoverable());
}

#[test]
fn stop_rewinds_and_clears_animated_values() {
    let (mut wp, mut doc) = load("repeat-freeze");
    wp.start(&mut doc).unwrap();
    doc.advance_clock(500);
    wp.update_animations(&mut doc).unwrap();
    assert!(doc.animated_value("bar", "width").is_some());

    wp.stop(&mut doc).unwrap();
    assert!(doc.animated_value("bar", "width").is_none());
    assert_eq!(wp.document_time(), TimeInstant::ZERO);
    assert!(!wp.is_valid_command(AnimationCommand::Stop));

    // a fresh start plays from the beginning again
    doc.take_dispatched();
    wp.start(&mut doc).unwrap();
    wp.update_animations(&mut doc).unwrap();
    assert_eq!(doc.dispatched().len(), 1);
    assert_eq!(doc.presented_value("bar", "width"), Some(&Value::n(0.0)));
}

#[test]
fn suspend_is_a_quiet_pause() {
    let (mut wp, mut doc) = load("repeat-freeze");
    wp.suspend(&mut doc);
    wp.start(&mut doc).unwrap();
    doc.advance_clock(300);
    wp.suspend(&mut doc);
    wp.suspend(&mut doc);
    doc.advance_clock(300);
    wp.update_animations(&mut doc).unwrap();
    assert_eq!(wp.document_time(), TimeInstant::from_ms(300));
    assert!(wp.is_valid_command(AnimationCommand::Unpause));
}

#[test]
fn disabled_animations_do_not_update() {
    let (mut wp, mut doc) = load("repeat-freeze");
    wp.set_animations_enabled(false);
    wp.start(&mut doc).unwrap();
    doc.advance_clock(500);
    let out = wp.update_animations(&mut doc).unwrap();
    assert!(out.is_empty());
    assert!(doc.animated_value("bar", "width").is_none());
}

#[test]
fn wake_up_delay_tracks_the_next_boundary() {
    let (mut wp, mut doc) = load("timelines");
    wp.start(&mut doc).unwrap();
    let out = wp.update_animations(&mut doc).unwrap();
    assert_eq!(out.next_update_in, Some(1000));

    wp.set_playback_rate(2.0, &mut doc).unwrap();
    doc.advance_clock(100);
    let out = wp.update_animations(&mut doc).unwrap();
    assert_eq!(wp.document_time(), TimeInstant::from_ms(200));
    // 800 document ms at double speed
    assert_eq!(out.next_update_in, Some(400));

    let (mut wp, mut doc) = load("repeat-freeze");
    wp.start(&mut doc).unwrap();
    let out = wp.update_animations(&mut doc).unwrap();
    assert_eq!(out.next_update_in, Some(10));

    wp.pause(&mut doc).unwrap();
    let out = wp.update_animations(&mut doc).unwrap();
    assert_eq!(out.next_update_in, None);
}

#[test]
fn invalid_animations_only_wake_at_boundaries() {
    let mut doc = MemoryDocument::from_json(
        r#"{"elements": [
            {"id": "rect", "attributes": {"x": {"type": "Number", "data": 1}}},
            {"id": "broken", "parent": "rect", "timing": {"dur": {"ms": 2000}},
             "animation": {"attribute": {"name": "x"}}}
        ]}"#,
    )
    .unwrap();
    let mut wp = Workplace::default();
    wp.register_document(&mut doc).unwrap();
    wp.start(&mut doc).unwrap();
    let out = wp.update_animations(&mut doc).unwrap();
    assert_eq!(out.next_update_in, Some(2000));
}

#[test]
fn media_timelines_receive_playback_commands() {
    let (mut wp, mut doc) = load("timelines");
    wp.set_document_time(1200, &mut doc).unwrap();
    assert_eq!(
        doc.media_commands(),
        &[("clip".to_string(), MediaCommand::Play { from_ms: 0 })]
    );

    wp.set_document_time(4500, &mut doc).unwrap();
    assert_eq!(
        doc.media_commands().last(),
        Some(&("clip".to_string(), MediaCommand::Stop))
    );

    // replay back into the clip restarts it at the right offset
    wp.set_document_time(3000, &mut doc).unwrap();
    assert_eq!(
        doc.media_commands().last(),
        Some(&("clip".to_string(), MediaCommand::Play { from_ms: 2000 }))
    );
}

#[test]
fn pausing_pauses_active_media() {
    let (mut wp, mut doc) = load("timelines");
    wp.start(&mut doc).unwrap();
    wp.set_document_time(1500, &mut doc).unwrap();
    wp.pause(&mut doc).unwrap();
    wp.unpause(&mut doc).unwrap();
    let tail: Vec<MediaCommand> = doc
        .media_commands()
        .iter()
        .rev()
        .take(2)
        .map(|(_, c)| *c)
        .collect();
    assert_eq!(tail, vec![MediaCommand::Resume, MediaCommand::Pause]);
}

#[test]
fn nested_timelines_get_local_time() {
    let (mut wp, mut doc) = load("timelines");
    wp.set_document_time(1200, &mut doc).unwrap();
    assert_eq!(doc.nested_time("inset"), None);

    // inset begins 500 ms after the clip
    wp.set_document_time(2000, &mut doc).unwrap();
    assert_eq!(doc.nested_time("inset"), Some(500));
}

#[test]
fn boundary_budget_jumps_to_the_target() {
    let config = WorkplaceConfig {
        max_boundary_steps: 1,
        ..WorkplaceConfig::default()
    };
    let mut doc = MemoryDocument::from_json(
        r#"{"elements": [
            {"id": "tick", "timing": {"dur": {"ms": 100}, "repeat_count": "indefinite"}}
        ]}"#,
    )
    .unwrap();
    let mut wp = Workplace::new(config);
    wp.register_document(&mut doc).unwrap();

    let out = wp.set_document_time(1000, &mut doc).unwrap();
    assert!(out.events.contains(&CoreEvent::StepBudgetExhausted {
        time: TimeInstant::from_ms(1000)
    }));
    let repeats = out.timing_events().filter(|e| e.name() == "repeatEvent").count();
    // one stepped boundary, the rest caught up at the target
    assert_eq!(repeats, 10);
    assert_eq!(wp.document_time(), TimeInstant::from_ms(1000));
}
