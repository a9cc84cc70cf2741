use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::core::TargetEvent;
use crate::host::api::{Document, ListenerGuard, Scheduler};
use crate::schedule::poll::{PollGuard, PollPolicy, poll_until};

/// Connects tracker notifications on the scene root to the session.
///
/// Subscribes only once both the scene root and the video element exist; a missing element is a
/// silent skip. With a non-disabled retry policy the bridge keeps looking for them.
pub(crate) struct SceneBridge {
    document: Rc<dyn Document>,
    media_id: String,
    listeners: RefCell<Vec<ListenerGuard>>,
    retry: RefCell<Option<PollGuard>>,
}

impl SceneBridge {
    pub(crate) fn new(document: Rc<dyn Document>, media_id: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            document,
            media_id: media_id.into(),
            listeners: RefCell::new(Vec::new()),
            retry: RefCell::new(None),
        })
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        !self.listeners.borrow().is_empty()
    }

    /// Subscribe now if possible, otherwise poll per `retry`.
    pub(crate) fn attach(
        self: &Rc<Self>,
        scheduler: &Rc<dyn Scheduler>,
        retry: PollPolicy,
        on_event: Rc<dyn Fn(TargetEvent)>,
    ) {
        if self.try_attach(&on_event) {
            return;
        }
        tracing::debug!("scene root or video missing at readiness");
        if retry.is_disabled() {
            return;
        }
        let bridge = Rc::downgrade(self);
        let guard = poll_until(
            scheduler,
            retry,
            move || {
                bridge
                    .upgrade()
                    .is_none_or(|bridge| bridge.try_attach(&on_event))
            },
            || tracing::warn!("scene root or video never appeared; target events are not bridged"),
        );
        *self.retry.borrow_mut() = Some(guard);
    }

    fn try_attach(&self, on_event: &Rc<dyn Fn(TargetEvent)>) -> bool {
        if self.is_subscribed() {
            return true;
        }
        let Some(scene) = self.document.scene_root() else {
            return false;
        };
        if self.document.media_element(&self.media_id).is_none() {
            return false;
        }

        let guards = [TargetEvent::Found, TargetEvent::Lost].map(|event| {
            let on_event = Rc::clone(on_event);
            scene.listen(event, Box::new(move || on_event(event)))
        });
        self.listeners.borrow_mut().extend(guards);
        tracing::info!("subscribed to target events");
        true
    }

    /// Remove listeners and stop any pending re-subscription.
    pub(crate) fn detach(&self) {
        self.retry.borrow_mut().take();
        let listeners: Vec<ListenerGuard> = self.listeners.borrow_mut().drain(..).collect();
        drop(listeners);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/bridge.rs"]
mod tests;
