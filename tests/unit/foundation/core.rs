use super::*;

fn failed(stage: LoadStage) -> LoadState {
    LoadState::Failed {
        stage,
        reason: "x".to_string(),
    }
}

#[test]
fn load_state_only_moves_forward() {
    assert!(LoadState::Pending.can_become(&LoadState::EngineAReady));
    assert!(LoadState::EngineAReady.can_become(&LoadState::BothReady));
    assert!(!LoadState::EngineAReady.can_become(&LoadState::Pending));
    assert!(!LoadState::BothReady.can_become(&LoadState::Pending));
    assert!(!LoadState::BothReady.can_become(&failed(LoadStage::Tracker)));
}

#[test]
fn failed_state_returns_only_to_its_waiting_state() {
    let f = failed(LoadStage::Tracker);
    assert!(f.can_become(&LoadState::EngineAReady));
    assert!(!f.can_become(&LoadState::Pending));
    assert!(!f.can_become(&LoadState::BothReady));
    assert!(failed(LoadStage::Renderer).can_become(&LoadState::Pending));
}

#[test]
fn stage_order_and_waiting_states() {
    assert_eq!(LoadStage::Renderer.next(), Some(LoadStage::Tracker));
    assert_eq!(LoadStage::Tracker.next(), None);
    assert_eq!(LoadStage::Tracker.waiting_state(), LoadState::EngineAReady);
}

#[test]
fn audio_preference_toggle_is_an_involution() {
    let p = AudioPreference::default();
    assert!(p.is_muted());
    assert_eq!(p.toggled().toggled(), p);
    assert!(!p.toggled().is_muted());
}

#[test]
fn target_event_dom_names() {
    assert_eq!(TargetEvent::Found.dom_name(), "targetFound");
    assert_eq!(TargetEvent::Lost.dom_name(), "targetLost");
    assert_eq!(TargetEvent::Lost.visibility(), TargetVisibility::Lost);
}

#[test]
fn load_state_serializes_with_tag() {
    let v = serde_json::to_value(failed(LoadStage::Renderer)).unwrap();
    assert_eq!(v["state"], "failed");
    assert_eq!(v["stage"], "renderer");
}

#[test]
fn failure_must_match_the_outstanding_stage() {
    assert!(LoadState::Pending.can_become(&failed(LoadStage::Renderer)));
    assert!(!LoadState::Pending.can_become(&failed(LoadStage::Tracker)));
    assert!(LoadState::EngineAReady.can_become(&failed(LoadStage::Tracker)));
}
