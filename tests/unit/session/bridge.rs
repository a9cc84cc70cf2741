use std::time::Duration;

use super::*;
use crate::host::sim::SimHost;

fn recorder() -> (Rc<RefCell<Vec<TargetEvent>>>, Rc<dyn Fn(TargetEvent)>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    (seen, Rc::new(move |e: TargetEvent| sink.borrow_mut().push(e)))
}

fn parts() -> (Rc<SimHost>, Rc<dyn Scheduler>, Rc<SceneBridge>) {
    let sim = Rc::new(SimHost::new());
    let sched = Rc::clone(&sim) as Rc<dyn Scheduler>;
    let bridge = SceneBridge::new(Rc::clone(&sim) as Rc<dyn Document>, "ar-video");
    (sim, sched, bridge)
}

#[test]
fn forwards_events_in_emission_order() {
    let (sim, sched, bridge) = parts();
    let scene = sim.install_scene();
    sim.install_media("ar-video");
    let (seen, on_event) = recorder();

    bridge.attach(&sched, PollPolicy::bounded(100, 0), on_event);
    assert!(bridge.is_subscribed());
    scene.emit(TargetEvent::Found);
    scene.emit(TargetEvent::Lost);
    scene.emit(TargetEvent::Found);
    assert_eq!(
        *seen.borrow(),
        vec![TargetEvent::Found, TargetEvent::Lost, TargetEvent::Found]
    );
}

#[test]
fn missing_elements_are_a_silent_no_op_without_retry() {
    let (sim, sched, bridge) = parts();
    let (seen, on_event) = recorder();

    bridge.attach(&sched, PollPolicy::bounded(100, 0), on_event);
    assert!(!bridge.is_subscribed());
    assert_eq!(sim.active_timers(), 0);

    // Elements appearing later are not picked up.
    let scene = sim.install_scene();
    sim.install_media("ar-video");
    sim.advance(Duration::from_secs(5));
    assert_eq!(scene.emit(TargetEvent::Found), 0);
    assert!(seen.borrow().is_empty());
}

#[test]
fn scene_without_video_does_not_subscribe() {
    let (sim, sched, bridge) = parts();
    let scene = sim.install_scene();
    let (_seen, on_event) = recorder();
    bridge.attach(&sched, PollPolicy::bounded(100, 0), on_event);
    assert_eq!(scene.listener_count(), 0);
}

#[test]
fn retry_subscribes_once_elements_appear() {
    let (sim, sched, bridge) = parts();
    let (seen, on_event) = recorder();
    bridge.attach(&sched, PollPolicy::bounded(100, 10), on_event);
    sim.advance(Duration::from_millis(250));
    assert!(!bridge.is_subscribed());

    let scene = sim.install_scene();
    sim.install_media("ar-video");
    sim.advance(Duration::from_millis(100));
    assert!(bridge.is_subscribed());
    assert_eq!(scene.listener_count(), 2);
    assert_eq!(sim.active_timers(), 0);

    scene.emit(TargetEvent::Found);
    assert_eq!(*seen.borrow(), vec![TargetEvent::Found]);
}

#[test]
fn detach_removes_listeners_and_retry() {
    let (sim, sched, bridge) = parts();
    let (_seen, on_event) = recorder();
    bridge.attach(&sched, PollPolicy::bounded(100, 10), on_event);
    assert_eq!(sim.active_timers(), 1);
    bridge.detach();
    assert_eq!(sim.active_timers(), 0);

    let scene = sim.install_scene();
    sim.install_media("ar-video");
    let (_seen, on_event) = recorder();
    bridge.attach(&sched, PollPolicy::bounded(100, 0), on_event);
    assert_eq!(scene.listener_count(), 2);
    bridge.detach();
    assert_eq!(scene.listener_count(), 0);
}
