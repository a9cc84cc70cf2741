use std::cell::Cell;

use super::*;
use crate::host::sim::SimHost;

fn sim() -> (Rc<SimHost>, Rc<dyn Scheduler>) {
    let sim = Rc::new(SimHost::new());
    let sched: Rc<dyn Scheduler> = Rc::clone(&sim) as Rc<dyn Scheduler>;
    (sim, sched)
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn stops_checking_after_first_success() {
    let (sim, sched) = sim();
    let checks = Rc::new(Cell::new(0u32));
    let c = Rc::clone(&checks);
    let guard = poll_until(
        &sched,
        PollPolicy::unbounded(100),
        move || {
            c.set(c.get() + 1);
            c.get() == 3
        },
        || {},
    );

    sim.advance(ms(1_000));
    assert_eq!(checks.get(), 3);
    assert!(!guard.is_active());
    assert_eq!(sim.active_timers(), 0);
}

#[test]
fn bounded_policy_reports_exhaustion_once() {
    let (sim, sched) = sim();
    let exhausted = Rc::new(Cell::new(0u32));
    let e = Rc::clone(&exhausted);
    let _guard = poll_until(
        &sched,
        PollPolicy::bounded(50, 4),
        || false,
        move || e.set(e.get() + 1),
    );

    sim.advance(ms(10_000));
    assert_eq!(exhausted.get(), 1);
    assert_eq!(sim.active_timers(), 0);
}

#[test]
fn dropping_guard_cancels_timer() {
    let (sim, sched) = sim();
    let checks = Rc::new(Cell::new(0u32));
    let c = Rc::clone(&checks);
    let guard = poll_until(
        &sched,
        PollPolicy::unbounded(100),
        move || {
            c.set(c.get() + 1);
            false
        },
        || {},
    );
    sim.advance(ms(250));
    assert_eq!(checks.get(), 2);

    drop(guard);
    sim.advance(ms(1_000));
    assert_eq!(checks.get(), 2);
    assert_eq!(sim.active_timers(), 0);
}

#[test]
fn disabled_policy_never_schedules() {
    let (sim, sched) = sim();
    let exhausted = Rc::new(Cell::new(false));
    let e = Rc::clone(&exhausted);
    let guard = poll_until(&sched, PollPolicy::bounded(100, 0), || true, move || e.set(true));
    assert!(exhausted.get());
    assert!(!guard.is_active());
    assert_eq!(sim.active_timers(), 0);
}
