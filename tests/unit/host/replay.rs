use super::*;
use crate::foundation::core::{AudioPreference, LoadState, PlaybackIssue, TargetVisibility};

const HAPPY_PATH: &str = r#"{
  "steps": [
    { "op": "resolve_script", "outcome": { "outcome": "loaded" } },
    { "op": "resolve_script", "outcome": { "outcome": "loaded" } },
    { "op": "install_scene" },
    { "op": "install_media" },
    { "op": "advance", "ms": 100 },
    { "op": "install_surface" },
    { "op": "advance", "ms": 100 },
    { "op": "emit", "event": "found" },
    { "op": "click" },
    { "op": "emit", "event": "lost" }
  ]
}"#;

#[test]
fn happy_path_loads_subscribes_and_plays() {
    let script = ReplayScript::from_json_str(HAPPY_PATH).expect("parse");
    let report = replay(SessionConfig::default(), &script).expect("replay");

    assert_eq!(report.snapshot.load_state, LoadState::BothReady);
    assert_eq!(report.snapshot.visibility, TargetVisibility::Lost);
    assert_eq!(report.snapshot.audio, AudioPreference::Unmuted);
    assert!(report.snapshot.subscribed);
    assert!(report.snapshot.surface_layered);

    let injected: Vec<&HostCall> = report
        .trace
        .iter()
        .filter(|c| matches!(c, HostCall::Inject { .. }))
        .collect();
    assert_eq!(injected.len(), 2);
    assert!(report.trace.contains(&HostCall::ApplyLayering { z_index: 1 }));

    let transport: Vec<&HostCall> = report
        .trace
        .iter()
        .filter(|c| matches!(c, HostCall::Play | HostCall::Pause | HostCall::SetMuted { .. }))
        .collect();
    assert_eq!(
        transport,
        vec![
            &HostCall::Play,
            &HostCall::SetMuted { muted: false },
            &HostCall::Play,
            &HostCall::Pause
        ]
    );
}

#[test]
fn blocked_autoplay_shows_gesture_hint() {
    let script = ReplayScript::from_json_str(
        r#"{ "steps": [
            { "op": "install_scene" },
            { "op": "install_media" },
            { "op": "set_play_mode", "mode": { "mode": "reject", "error": { "kind": "not_allowed" } } },
            { "op": "resolve_script", "outcome": { "outcome": "loaded" } },
            { "op": "resolve_script", "outcome": { "outcome": "loaded" } },
            { "op": "emit", "event": "found" }
        ] }"#,
    )
    .expect("parse");
    let report = replay(SessionConfig::default(), &script).expect("replay");
    assert_eq!(report.snapshot.playback_issue, PlaybackIssue::GestureRequired);
    let OverlayView::Active(active) = report.overlay else {
        panic!("expected active overlay");
    };
    assert!(active.gesture_hint);
}

#[test]
fn failed_load_then_retry() {
    let script = ReplayScript::from_json_str(
        r#"{ "steps": [
            { "op": "resolve_script", "outcome": { "outcome": "loaded" } },
            { "op": "resolve_script", "outcome": { "outcome": "failed", "reason": "404" } },
            { "op": "retry" },
            { "op": "resolve_script", "outcome": { "outcome": "loaded" } }
        ] }"#,
    )
    .expect("parse");
    let report = replay(SessionConfig::default(), &script).expect("replay");
    assert_eq!(report.snapshot.load_state, LoadState::BothReady);
    let injected = report
        .trace
        .iter()
        .filter(|c| matches!(c, HostCall::Inject { .. }))
        .count();
    assert_eq!(injected, 3);
}

#[test]
fn emitting_without_scene_names_the_step() {
    let script = ReplayScript {
        steps: vec![ReplayStep::Emit {
            event: TargetEvent::Found,
        }],
    };
    let err = replay(SessionConfig::default(), &script).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("step #0"), "{msg}");
    assert!(msg.contains("no scene root"), "{msg}");
}

#[test]
fn unknown_op_is_a_parse_error() {
    let err = ReplayScript::from_json_str(r#"{ "steps": [ { "op": "explode" } ] }"#).unwrap_err();
    assert!(matches!(err, ArError::Serde(_)));
}
