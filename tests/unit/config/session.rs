use super::*;

#[test]
fn defaults_match_the_shipped_widget() {
    let cfg = SessionConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.engines.locator(LoadStage::Renderer), DEFAULT_RENDERER_SRC);
    assert_eq!(cfg.engines.locator(LoadStage::Tracker), DEFAULT_TRACKER_SRC);
    assert_eq!(cfg.layer_poll_ms, 100);
    assert_eq!(cfg.surface_z_index, 1);
    assert_eq!(cfg.overlay_z_index, 99_999);
    assert_eq!(cfg.load_timeout(), Some(Duration::from_secs(20)));
    assert_eq!(cfg.layer_poll().max_attempts, None);
}

#[test]
fn partial_json_fills_defaults() {
    let cfg = SessionConfig::from_json_str(
        r#"{"load_timeout_ms": null, "scene": {"image_target_src": "/poster.mind"}}"#,
    )
    .unwrap();
    assert_eq!(cfg.load_timeout_ms, None);
    assert_eq!(cfg.scene.image_target_src, "/poster.mind");
    assert_eq!(cfg.engines, EngineBundles::default());
    cfg.validate().unwrap();
}

#[test]
fn unknown_fields_are_rejected() {
    let err = SessionConfig::from_json_str(r#"{"autoplay_unmuted": true}"#).unwrap_err();
    assert!(err.to_string().contains("serialization error:"));
}

#[test]
fn overlay_must_sit_above_surface() {
    let cfg = SessionConfig {
        overlay_z_index: 1,
        surface_z_index: 1,
        ..SessionConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn engines_must_be_distinct_and_present() {
    let mut cfg = SessionConfig::default();
    cfg.engines.tracker = cfg.engines.renderer.clone();
    assert!(cfg.validate().is_err());

    let mut cfg = SessionConfig::default();
    cfg.engines.renderer = " ".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn zero_timeouts_and_intervals_are_rejected() {
    let cfg = SessionConfig {
        load_timeout_ms: Some(0),
        ..SessionConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = SessionConfig {
        layer_poll_ms: 0,
        ..SessionConfig::default()
    };
    assert!(cfg.validate().is_err());

    let cfg = SessionConfig {
        bridge_retry: PollPolicy::bounded(0, 0),
        ..SessionConfig::default()
    };
    cfg.validate().unwrap();
}

#[test]
fn missing_file_is_a_validation_error() {
    let err = SessionConfig::from_path("target/does-not-exist/config.json").unwrap_err();
    assert!(err.to_string().contains("open session config"));
}
