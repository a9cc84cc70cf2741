//! "Await an external condition" for collaborators that expose no completion event.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::host::api::{Scheduler, TimerId};

/// How often to re-check a condition and how many times at most.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PollPolicy {
    /// Delay between checks, in milliseconds.
    pub interval_ms: u64,
    /// Give up after this many checks; `None` polls until cancelled. `Some(0)` never polls.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// Poll every `interval_ms` until cancelled.
    pub fn unbounded(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            max_attempts: None,
        }
    }

    /// Poll every `interval_ms`, at most `max_attempts` times.
    pub fn bounded(interval_ms: u64, max_attempts: u32) -> Self {
        Self {
            interval_ms,
            max_attempts: Some(max_attempts),
        }
    }

    /// True when the policy never checks at all.
    pub fn is_disabled(&self) -> bool {
        self.max_attempts == Some(0)
    }

    /// Check interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Owns a polling timer. Dropping or cancelling the guard stops polling.
#[must_use = "dropping the guard cancels polling"]
pub struct PollGuard {
    scheduler: Rc<dyn Scheduler>,
    timer: Rc<Cell<Option<TimerId>>>,
}

impl PollGuard {
    /// Whether the condition is still being polled.
    pub fn is_active(&self) -> bool {
        self.timer.get().is_some()
    }

    /// Stop polling. Safe to call repeatedly.
    pub fn cancel(&self) {
        if let Some(id) = self.timer.take() {
            self.scheduler.clear(id);
        }
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for PollGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollGuard")
            .field("timer", &self.timer.get())
            .finish()
    }
}

/// Check `done` every `policy.interval_ms` until it returns true.
///
/// The first check happens one interval after the call. The timer clears itself as soon as `done`
/// reports success, or after `policy.max_attempts` failed checks, in which case `on_exhausted`
/// runs once. A disabled policy calls `on_exhausted` immediately and returns an inactive guard.
pub fn poll_until(
    scheduler: &Rc<dyn Scheduler>,
    policy: PollPolicy,
    mut done: impl FnMut() -> bool + 'static,
    on_exhausted: impl FnOnce() + 'static,
) -> PollGuard {
    let timer: Rc<Cell<Option<TimerId>>> = Rc::new(Cell::new(None));
    let guard = PollGuard {
        scheduler: Rc::clone(scheduler),
        timer: Rc::clone(&timer),
    };
    if policy.is_disabled() {
        on_exhausted();
        return guard;
    }

    let slot = Rc::clone(&timer);
    let sched = Rc::downgrade(scheduler);
    let mut attempts: u32 = 0;
    let mut on_exhausted = Some(on_exhausted);
    let id = scheduler.set_interval(
        policy.interval(),
        Box::new(move || {
            if slot.get().is_none() {
                return;
            }
            attempts = attempts.saturating_add(1);
            let finished = done();
            let exhausted = !finished && policy.max_attempts.is_some_and(|max| attempts >= max);
            if !(finished || exhausted) {
                return;
            }
            if let (Some(id), Some(sched)) = (slot.take(), sched.upgrade()) {
                sched.clear(id);
            }
            if exhausted {
                tracing::debug!(attempts, "poll gave up");
                if let Some(f) = on_exhausted.take() {
                    f();
                }
            }
        }),
    );
    timer.set(Some(id));
    guard
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/poll.rs"]
mod tests;
