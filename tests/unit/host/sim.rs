use super::*;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn intervals_fire_once_per_period_until_cleared() {
    let sim = SimHost::new();
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    let id = sim.set_interval(ms(100), Box::new(move || h.set(h.get() + 1)));

    sim.advance(ms(99));
    assert_eq!(hits.get(), 0);
    sim.advance(ms(251));
    assert_eq!(hits.get(), 3);

    sim.clear(id);
    sim.advance(ms(1_000));
    assert_eq!(hits.get(), 3);
    assert_eq!(sim.active_timers(), 0);
}

#[test]
fn timeouts_fire_once_and_clear_is_idempotent() {
    let sim = SimHost::new();
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    let id = sim.set_timeout(ms(50), Box::new(move || h.set(h.get() + 1)));
    sim.advance(ms(500));
    assert_eq!(hits.get(), 1);

    sim.clear(id);
    assert!(
        !sim.trace()
            .iter()
            .any(|c| matches!(c, HostCall::ClearTimer { .. }))
    );
}

#[test]
fn scripts_stay_pending_until_resolved() {
    let sim = SimHost::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    sim.inject("a.js", Box::new(move |o| s.borrow_mut().push(o)));

    assert_eq!(sim.pending_scripts(), vec![0]);
    sim.resolve_script(0, ScriptOutcome::Loaded).unwrap();
    assert_eq!(*seen.borrow(), vec![ScriptOutcome::Loaded]);
    assert!(sim.resolve_script(0, ScriptOutcome::Loaded).is_err());
    assert!(sim.resolve_next(ScriptOutcome::Loaded).is_err());
}

#[test]
fn queries_are_counted_and_miss_before_install() {
    let sim = SimHost::new();
    assert!(sim.scene_root().is_none());
    assert!(sim.media_element("ar-video").is_none());
    assert_eq!(sim.scene_queries(), 2);

    sim.install_media("ar-video");
    assert!(sim.media_element("ar-video").is_some());
    assert!(sim.media_element("other").is_none());
}

#[test]
fn dropping_listener_guard_detaches() {
    let sim = SimHost::new();
    let scene = sim.install_scene();
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    let guard = scene.listen(TargetEvent::Found, Box::new(move || h.set(h.get() + 1)));

    assert_eq!(scene.emit(TargetEvent::Found), 1);
    assert_eq!(scene.emit(TargetEvent::Lost), 0);
    drop(guard);
    assert_eq!(scene.emit(TargetEvent::Found), 0);
    assert_eq!(hits.get(), 1);
    assert_eq!(scene.listener_count(), 0);
}

#[test]
fn pause_aborts_deferred_play() {
    let sim = SimHost::new();
    let media = sim.install_media("v");
    media.set_play_mode(PlayMode::Defer);
    let result = Rc::new(RefCell::new(None));
    let r = Rc::clone(&result);
    media.play(Box::new(move |res| *r.borrow_mut() = Some(res)));
    assert_eq!(media.pending_plays(), 1);

    media.pause();
    assert_eq!(*result.borrow(), Some(Err(PlayError::Aborted)));
    assert!(media.is_paused());
    assert!(!media.settle_next_play(Ok(())));
}
