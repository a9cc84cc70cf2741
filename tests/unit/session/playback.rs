use super::*;
use crate::host::sim::{MediaCall, PlayMode, SimHost, SimMedia};

struct Fixture {
    media: Rc<SimMedia>,
    playback: Rc<PlaybackController>,
    changes: Rc<Cell<u32>>,
    _sim: Rc<SimHost>,
}

fn fixture() -> Fixture {
    let sim = Rc::new(SimHost::new());
    let media = sim.install_media("ar-video");
    let changes = Rc::new(Cell::new(0));
    let c = Rc::clone(&changes);
    let playback = PlaybackController::new(
        Rc::clone(&sim) as Rc<dyn Document>,
        "ar-video",
        move || c.set(c.get() + 1),
    );
    Fixture {
        media,
        playback,
        changes,
        _sim: sim,
    }
}

#[test]
fn found_lost_found_maps_to_play_pause_play() {
    let f = fixture();
    for v in [
        TargetVisibility::Found,
        TargetVisibility::Lost,
        TargetVisibility::Found,
    ] {
        f.playback.on_visibility(v);
    }
    assert_eq!(
        f.media.transport_calls(),
        vec![MediaCall::Play, MediaCall::Pause, MediaCall::Play]
    );
    assert!(!f.media.is_paused());
}

#[test]
fn repeated_commands_in_same_state_are_harmless() {
    let f = fixture();
    f.playback.on_visibility(TargetVisibility::Lost);
    f.playback.on_visibility(TargetVisibility::Lost);
    f.playback.on_visibility(TargetVisibility::Found);
    f.playback.on_visibility(TargetVisibility::Found);
    assert_eq!(f.media.transport_calls().len(), 4);
    assert_eq!(f.playback.issue(), PlaybackIssue::None);
}

#[test]
fn commands_queue_behind_unsettled_play() {
    let f = fixture();
    f.media.set_play_mode(PlayMode::Defer);
    f.playback.on_visibility(TargetVisibility::Found);
    f.playback.on_visibility(TargetVisibility::Lost);
    f.playback.on_visibility(TargetVisibility::Found);

    assert_eq!(f.media.transport_calls(), vec![MediaCall::Play]);
    assert_eq!(f.playback.queued(), 2);

    assert!(f.media.settle_next_play(Ok(())));
    assert_eq!(
        f.media.transport_calls(),
        vec![MediaCall::Play, MediaCall::Pause, MediaCall::Play]
    );
    assert_eq!(f.playback.queued(), 0);
    assert_eq!(f.media.pending_plays(), 1);
}

#[test]
fn toggle_twice_restores_preference_with_two_plays() {
    let f = fixture();
    assert_eq!(
        f.playback.toggle(UserGesture::within_handler()),
        Some(AudioPreference::Unmuted)
    );
    assert!(!f.media.muted());
    assert_eq!(f.media.transport_calls(), vec![MediaCall::Play]);

    assert_eq!(
        f.playback.toggle(UserGesture::within_handler()),
        Some(AudioPreference::Muted)
    );
    assert!(f.media.muted());
    assert_eq!(
        f.media.calls(),
        vec![
            MediaCall::SetMuted(false),
            MediaCall::Play,
            MediaCall::SetMuted(true),
            MediaCall::Play
        ]
    );
    assert_eq!(f.playback.preference(), AudioPreference::Muted);
    assert_eq!(f.changes.get(), 2);
}

#[test]
fn toggle_without_media_is_a_no_op() {
    let sim = Rc::new(SimHost::new());
    let playback = PlaybackController::new(Rc::clone(&sim) as Rc<dyn Document>, "ar-video", || {});
    assert_eq!(playback.toggle(UserGesture::within_handler()), None);
    assert_eq!(playback.preference(), AudioPreference::Muted);
}

#[test]
fn preference_survives_target_loss() {
    let f = fixture();
    f.playback.toggle(UserGesture::within_handler());
    f.playback.on_visibility(TargetVisibility::Lost);
    f.playback.on_visibility(TargetVisibility::Found);
    assert_eq!(f.playback.preference(), AudioPreference::Unmuted);
    assert!(!f.media.muted());
}

#[test]
fn autoplay_rejection_requests_gesture_and_success_clears_it() {
    let f = fixture();
    f.media.set_play_mode(PlayMode::Reject(PlayError::NotAllowed));
    f.playback.on_visibility(TargetVisibility::Found);
    assert_eq!(f.playback.issue(), PlaybackIssue::GestureRequired);

    f.media.set_play_mode(PlayMode::Resolve);
    f.playback.toggle(UserGesture::within_handler());
    assert_eq!(f.playback.issue(), PlaybackIssue::None);
}

#[test]
fn aborted_play_is_benign_and_other_errors_are_recorded() {
    let f = fixture();
    f.media.set_play_mode(PlayMode::Reject(PlayError::Aborted));
    f.playback.on_visibility(TargetVisibility::Found);
    assert_eq!(f.playback.issue(), PlaybackIssue::None);

    f.media
        .set_play_mode(PlayMode::Reject(PlayError::Other("decode".to_string())));
    f.playback.on_visibility(TargetVisibility::Found);
    assert_eq!(
        f.playback.issue(),
        PlaybackIssue::Failed("decode".to_string())
    );
}

#[test]
fn close_drops_queue_and_ignores_later_events() {
    let f = fixture();
    f.media.set_play_mode(PlayMode::Defer);
    f.playback.on_visibility(TargetVisibility::Found);
    f.playback.on_visibility(TargetVisibility::Lost);
    f.playback.close();
    f.media.settle_next_play(Ok(()));
    f.playback.on_visibility(TargetVisibility::Found);
    assert_eq!(f.media.transport_calls(), vec![MediaCall::Play]);
    assert_eq!(f.playback.toggle(UserGesture::within_handler()), None);
}
