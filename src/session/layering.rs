use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::host::api::{Document, Layering, Scheduler};
use crate::schedule::poll::{PollGuard, PollPolicy, poll_until};

/// Watchdog that pins the engine's drawing surface beneath the UI overlay.
///
/// The engine creates its canvas on its own schedule and emits nothing when it does, so the
/// enforcer polls for it, applies the layering once, and stops. The surface is created once per
/// session; there is no continuous enforcement.
pub(crate) struct LayeringEnforcer {
    document: Rc<dyn Document>,
    layering: Layering,
    policy: PollPolicy,
    applied: Cell<bool>,
    watchdog: RefCell<Option<PollGuard>>,
}

impl LayeringEnforcer {
    pub(crate) fn new(
        document: Rc<dyn Document>,
        layering: Layering,
        policy: PollPolicy,
    ) -> Rc<Self> {
        Rc::new(Self {
            document,
            layering,
            policy,
            applied: Cell::new(false),
            watchdog: RefCell::new(None),
        })
    }

    pub(crate) fn is_applied(&self) -> bool {
        self.applied.get()
    }

    pub(crate) fn is_polling(&self) -> bool {
        self.watchdog
            .borrow()
            .as_ref()
            .is_some_and(PollGuard::is_active)
    }

    /// Begin polling; `on_applied` runs after the one correction.
    pub(crate) fn start(
        self: &Rc<Self>,
        scheduler: &Rc<dyn Scheduler>,
        on_applied: impl Fn() + 'static,
    ) {
        if self.is_applied() || self.is_polling() {
            return;
        }
        let enforcer = Rc::downgrade(self);
        let guard = poll_until(
            scheduler,
            self.policy,
            move || {
                let Some(enforcer) = enforcer.upgrade() else {
                    return true;
                };
                let corrected = enforcer.try_correct();
                if corrected {
                    on_applied();
                }
                corrected
            },
            || {},
        );
        *self.watchdog.borrow_mut() = Some(guard);
    }

    fn try_correct(&self) -> bool {
        let Some(surface) = self.document.render_surface() else {
            return false;
        };
        surface.apply_layering(&self.layering);
        self.applied.set(true);
        tracing::info!(z_index = self.layering.z_index, "render surface pinned beneath overlay");
        true
    }

    /// Cancel the watchdog if it is still running.
    pub(crate) fn stop(&self) {
        self.watchdog.borrow_mut().take();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/layering.rs"]
mod tests;
