use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::foundation::core::{AudioPreference, PlaybackIssue, TargetVisibility};
use crate::host::api::{Document, MediaElement, PlayError};

/// Proof that the caller is running inside a user-initiated event handler.
///
/// Browsers only allow unmuted playback when `muted = false` and `play()` happen in the call stack
/// of a user gesture. [`crate::ArSession::toggle_audio`] is the only API that unmutes, and it
/// requires this token. Create it at the top of a click/tap handler and pass it straight in; do
/// not store it or create it from timers, promises or engine callbacks.
#[derive(Debug)]
pub struct UserGesture {
    _private: (),
}

impl UserGesture {
    /// Assert that the current call stack originates from a user interaction.
    pub fn within_handler() -> Self {
        Self { _private: () }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Play,
    Pause,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Visibility,
    Gesture,
}

/// Owns the video element's mute and transport state.
///
/// Visibility-driven commands are single-flight: while a `play()` promise is unsettled, later
/// commands wait in arrival order and are dispatched once it settles. Gesture-driven playback
/// bypasses the queue so it stays inside the gesture's call stack.
pub(crate) struct PlaybackController {
    document: Rc<dyn Document>,
    media_id: String,
    preference: Cell<AudioPreference>,
    issue: RefCell<PlaybackIssue>,
    in_flight: Cell<bool>,
    queue: RefCell<VecDeque<Command>>,
    closed: Cell<bool>,
    on_change: Box<dyn Fn()>,
}

impl PlaybackController {
    pub(crate) fn new(
        document: Rc<dyn Document>,
        media_id: impl Into<String>,
        on_change: impl Fn() + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            document,
            media_id: media_id.into(),
            preference: Cell::new(AudioPreference::default()),
            issue: RefCell::new(PlaybackIssue::None),
            in_flight: Cell::new(false),
            queue: RefCell::new(VecDeque::new()),
            closed: Cell::new(false),
            on_change: Box::new(on_change),
        })
    }

    pub(crate) fn preference(&self) -> AudioPreference {
        self.preference.get()
    }

    pub(crate) fn issue(&self) -> PlaybackIssue {
        self.issue.borrow().clone()
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queue.borrow().len()
    }

    fn media(&self) -> Option<Rc<dyn MediaElement>> {
        self.document.media_element(&self.media_id)
    }

    /// Found plays, lost pauses.
    pub(crate) fn on_visibility(self: &Rc<Self>, visibility: TargetVisibility) {
        if self.closed.get() {
            return;
        }
        let command = match visibility {
            TargetVisibility::Found => Command::Play,
            TargetVisibility::Lost => Command::Pause,
        };
        if self.in_flight.get() {
            tracing::debug!(?command, "play in flight; queueing");
            self.queue.borrow_mut().push_back(command);
            return;
        }
        self.dispatch(command);
    }

    fn dispatch(self: &Rc<Self>, command: Command) {
        let Some(media) = self.media() else {
            tracing::debug!(?command, "video element missing; dropping command");
            return;
        };
        match command {
            Command::Pause => media.pause(),
            Command::Play => {
                self.in_flight.set(true);
                let controller = Rc::downgrade(self);
                media.play(Box::new(move |result| {
                    if let Some(controller) = controller.upgrade() {
                        controller.settled(Origin::Visibility, result);
                    }
                }));
            }
        }
    }

    /// Flip the mute preference and resume playback in the same call stack.
    pub(crate) fn toggle(self: &Rc<Self>, _gesture: UserGesture) -> Option<AudioPreference> {
        if self.closed.get() {
            return None;
        }
        let Some(media) = self.media() else {
            tracing::debug!("video element missing; toggle ignored");
            return None;
        };
        let next = self.preference.get().toggled();
        self.preference.set(next);
        media.set_muted(next.is_muted());
        let controller = Rc::downgrade(self);
        media.play(Box::new(move |result| {
            if let Some(controller) = controller.upgrade() {
                controller.settled(Origin::Gesture, result);
            }
        }));
        tracing::info!(preference = ?next, "audio toggled");
        (self.on_change)();
        Some(next)
    }

    fn settled(self: &Rc<Self>, origin: Origin, result: Result<(), PlayError>) {
        if origin == Origin::Visibility {
            self.in_flight.set(false);
        }
        if self.closed.get() {
            return;
        }

        let issue = match result {
            Ok(()) => Some(PlaybackIssue::None),
            Err(PlayError::NotAllowed) => {
                tracing::warn!(?origin, "play() blocked by autoplay policy");
                Some(PlaybackIssue::GestureRequired)
            }
            Err(PlayError::Aborted) => {
                tracing::debug!(?origin, "play() interrupted by pause()");
                None
            }
            Err(PlayError::Other(reason)) => {
                tracing::warn!(?origin, %reason, "play() failed");
                Some(PlaybackIssue::Failed(reason))
            }
        };
        if let Some(issue) = issue {
            let changed = *self.issue.borrow() != issue;
            *self.issue.borrow_mut() = issue;
            if changed {
                (self.on_change)();
            }
        }

        while !self.in_flight.get() {
            let next = self.queue.borrow_mut().pop_front();
            let Some(command) = next else { break };
            self.dispatch(command);
        }
    }

    /// Stop reacting; pending commands are dropped.
    pub(crate) fn close(&self) {
        self.closed.set(true);
        self.queue.borrow_mut().clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/playback.rs"]
mod tests;
