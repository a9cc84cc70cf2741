use super::*;
use crate::foundation::core::TargetVisibility;

fn snapshot(load_state: LoadState) -> SessionSnapshot {
    SessionSnapshot {
        load_state,
        visibility: TargetVisibility::Lost,
        audio: AudioPreference::Muted,
        playback_issue: PlaybackIssue::None,
        subscribed: false,
        surface_layered: false,
        torn_down: false,
    }
}

#[test]
fn loading_view_is_text_only() {
    let config = SessionConfig::default();
    for state in [LoadState::Pending, LoadState::EngineAReady] {
        let view = OverlayView::from_snapshot(&snapshot(state), &config);
        assert_eq!(
            view,
            OverlayView::Loading {
                text: config.loading_text.clone()
            }
        );
        let html = view.to_html();
        assert!(!html.contains("a-scene"));
        assert!(!html.contains("<button"));
    }
}

#[test]
fn failed_view_names_stage_and_offers_retry() {
    let config = SessionConfig::default();
    let view = OverlayView::from_snapshot(
        &snapshot(LoadState::Failed {
            stage: LoadStage::Tracker,
            reason: "network".to_string(),
        }),
        &config,
    );
    let OverlayView::Failed { message } = &view else {
        panic!("expected failed view, got {view:?}");
    };
    assert!(message.contains("image tracker"));
    assert!(message.contains("network"));
    assert!(view.to_html().contains(&format!(r#"id="{RETRY_CONTROL_ID}""#)));
}

#[test]
fn active_view_icon_follows_preference() {
    let config = SessionConfig::default();
    let mut snap = snapshot(LoadState::BothReady);
    let OverlayView::Active(muted) = OverlayView::from_snapshot(&snap, &config) else {
        panic!("expected active view");
    };
    assert_eq!(muted.icon, MuteIcon::Muted);
    assert!(muted.control_html().contains(r#"aria-label="Unmute""#));

    snap.audio = AudioPreference::Unmuted;
    let OverlayView::Active(unmuted) = OverlayView::from_snapshot(&snap, &config) else {
        panic!("expected active view");
    };
    assert_eq!(unmuted.icon, MuteIcon::Unmuted);
    assert!(unmuted.control_html().contains(r#"aria-label="Mute""#));
}

#[test]
fn gesture_hint_only_when_autoplay_was_blocked() {
    let config = SessionConfig::default();
    let mut snap = snapshot(LoadState::BothReady);
    snap.playback_issue = PlaybackIssue::GestureRequired;
    let OverlayView::Active(active) = OverlayView::from_snapshot(&snap, &config) else {
        panic!("expected active view");
    };
    assert!(active.gesture_hint);
    assert!(active.control_html().contains("data-hint"));

    snap.playback_issue = PlaybackIssue::Failed("decode".to_string());
    let OverlayView::Active(active) = OverlayView::from_snapshot(&snap, &config) else {
        panic!("expected active view");
    };
    assert!(!active.gesture_hint);
    assert!(!active.control_html().contains("data-hint"));
}

#[test]
fn controls_stack_above_scene() {
    let config = SessionConfig::default();
    let view = OverlayView::from_snapshot(&snapshot(LoadState::BothReady), &config);
    let html = view.to_html();
    assert!(html.contains("z-index: 99999"));
    assert!(html.contains("<a-scene"));
    let controls = html.find(MUTE_CONTROL_ID).expect("mute control");
    let scene = html.find("<a-scene").expect("scene");
    assert!(controls < scene);
}

#[test]
fn loading_text_is_escaped() {
    let config = SessionConfig {
        loading_text: "<b>Loading</b> & more".to_string(),
        ..SessionConfig::default()
    };
    let html = OverlayView::from_snapshot(&snapshot(LoadState::Pending), &config).to_html();
    assert!(html.contains("&lt;b&gt;Loading&lt;/b&gt; &amp; more"));
}
