use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::config::session::SessionConfig;
use crate::foundation::core::{
    AudioPreference, LoadStage, LoadState, PlaybackIssue, TargetEvent, TargetVisibility,
};
use crate::foundation::error::{ArError, ArResult};
use crate::host::api::{Host, Layering};
use crate::session::bridge::SceneBridge;
use crate::session::gate::ReadinessGate;
use crate::session::layering::LayeringEnforcer;
use crate::session::loader::{LoadEvent, ScriptLoader};
use crate::session::overlay::OverlayView;
use crate::session::playback::{PlaybackController, UserGesture};

/// Point-in-time view of a session, suitable for rendering and assertions.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SessionSnapshot {
    /// Engine loading progress.
    pub load_state: LoadState,
    /// Last target notification from the tracker.
    pub visibility: TargetVisibility,
    /// User's mute preference.
    pub audio: AudioPreference,
    /// Outcome of the most recent `play()`.
    pub playback_issue: PlaybackIssue,
    /// Found/lost listeners are attached to the scene root.
    pub subscribed: bool,
    /// The render surface has been pinned beneath the overlay.
    pub surface_layered: bool,
    /// [`ArSession::teardown`] ran.
    pub torn_down: bool,
}

type Observer = Rc<dyn Fn(&SessionSnapshot)>;

/// The AR session lifecycle controller.
///
/// Loads the engines in order, opens the [`ReadinessGate`] once both executed, then bridges target
/// events to playback and pins the render surface beneath the overlay. All host interaction goes
/// through the [`Host`] seam, so the same controller runs against the browser and against
/// [`crate::SimHost`].
///
/// Dropping the session tears it down.
pub struct ArSession {
    inner: Rc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    host: Host,
    gate: ReadinessGate,
    load_state: RefCell<LoadState>,
    visibility: Cell<TargetVisibility>,
    mounted: Cell<bool>,
    torn_down: Cell<bool>,
    loader: Rc<ScriptLoader>,
    bridge: Rc<SceneBridge>,
    layering: Rc<LayeringEnforcer>,
    playback: Rc<PlaybackController>,
    observers: RefCell<Vec<Observer>>,
}

impl ArSession {
    /// Build a session over `host`. Nothing touches the host until [`ArSession::mount`].
    pub fn new(config: SessionConfig, host: Host) -> ArResult<Self> {
        config.validate()?;
        let inner = Rc::new_cyclic(|weak: &Weak<SessionInner>| {
            let media_id = config.scene.video.id.clone();

            let on_load = weak.clone();
            let loader = ScriptLoader::new(
                Rc::clone(&host.scheduler),
                Rc::clone(&host.scripts),
                config.engines.clone(),
                config.load_timeout(),
                move |event| {
                    if let Some(session) = on_load.upgrade() {
                        session.on_load_event(event);
                    }
                },
            );

            let on_playback = weak.clone();
            let playback = PlaybackController::new(
                Rc::clone(&host.document),
                media_id.clone(),
                move || {
                    if let Some(session) = on_playback.upgrade() {
                        session.notify();
                    }
                },
            );

            SessionInner {
                bridge: SceneBridge::new(Rc::clone(&host.document), media_id),
                layering: LayeringEnforcer::new(
                    Rc::clone(&host.document),
                    Layering {
                        z_index: config.surface_z_index,
                    },
                    config.layer_poll(),
                ),
                loader,
                playback,
                gate: ReadinessGate::default(),
                load_state: RefCell::new(LoadState::Pending),
                visibility: Cell::new(TargetVisibility::default()),
                mounted: Cell::new(false),
                torn_down: Cell::new(false),
                observers: RefCell::new(Vec::new()),
                config,
                host,
            }
        });
        Ok(Self { inner })
    }

    /// Configuration the session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Whether both engines executed.
    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_open()
    }

    /// Register a callback run after every observable state change.
    ///
    /// On readiness, observers run before the scene is queried, so a UI observer that renders
    /// [`ArSession::overlay`] puts the scene markup in place before the bridge looks for it.
    pub fn on_change(&self, observer: impl Fn(&SessionSnapshot) + 'static) {
        self.inner.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Start loading the engines. Later calls are ignored.
    #[tracing::instrument(skip(self))]
    pub fn mount(&self) {
        let inner = &self.inner;
        if inner.torn_down.get() {
            tracing::warn!("mount after teardown ignored");
            return;
        }
        if inner.mounted.replace(true) {
            tracing::warn!("session already mounted");
            return;
        }
        inner.notify();
        inner.loader.start(LoadStage::Renderer);
    }

    /// Flip the mute preference and resume playback. Must be called from a user gesture handler.
    ///
    /// Returns the new preference, or `None` when the engines are not ready, the session was torn
    /// down, or the video element is missing.
    pub fn toggle_audio(&self, gesture: UserGesture) -> Option<AudioPreference> {
        let inner = &self.inner;
        if inner.torn_down.get() || !inner.gate.is_open() {
            tracing::debug!("toggle before readiness ignored");
            return None;
        }
        inner.playback.toggle(gesture)
    }

    /// Resume loading from the stage that failed.
    ///
    /// A stage that timed out keeps waiting on the script already in the document; only a stage
    /// whose script errored is injected again.
    #[tracing::instrument(skip(self))]
    pub fn retry(&self) -> ArResult<()> {
        let inner = &self.inner;
        if inner.torn_down.get() {
            return Err(ArError::load("session was torn down"));
        }
        let state = inner.load_state.borrow().clone();
        let LoadState::Failed { stage, .. } = state else {
            return Err(ArError::load(format!("nothing to retry in state {state:?}")));
        };
        inner.transition(stage.waiting_state());
        inner.notify();
        inner.loader.resume(stage);
        Ok(())
    }

    /// Cancel timers, drop listeners and stop reacting to the host. Idempotent.
    #[tracing::instrument(skip(self))]
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    /// Current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot()
    }

    /// What the widget should show for the current state.
    pub fn overlay(&self) -> OverlayView {
        OverlayView::from_snapshot(&self.inner.snapshot(), &self.inner.config)
    }
}

impl Drop for ArSession {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl std::fmt::Debug for ArSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArSession")
            .field("snapshot", &self.inner.snapshot())
            .finish_non_exhaustive()
    }
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            load_state: self.load_state.borrow().clone(),
            visibility: self.visibility.get(),
            audio: self.playback.preference(),
            playback_issue: self.playback.issue(),
            subscribed: self.bridge.is_subscribed(),
            surface_layered: self.layering.is_applied(),
            torn_down: self.torn_down.get(),
        }
    }

    fn notify(&self) {
        let observers: Vec<Observer> = self.observers.borrow().clone();
        if observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in observers {
            observer(&snapshot);
        }
    }

    fn transition(&self, next: LoadState) -> bool {
        let mut state = self.load_state.borrow_mut();
        if !state.can_become(&next) {
            tracing::warn!(from = ?*state, to = ?next, "rejected load state transition");
            return false;
        }
        tracing::debug!(from = ?*state, to = ?next, "load state");
        *state = next;
        true
    }

    fn on_load_event(self: &Rc<Self>, event: LoadEvent) {
        if self.torn_down.get() {
            return;
        }
        if let LoadEvent::Loaded(stage) = &event {
            let stalled = matches!(
                &*self.load_state.borrow(),
                LoadState::Failed { stage: failed, .. } if failed == stage
            );
            if stalled {
                tracing::info!(?stage, "stalled engine bundle executed late");
                self.transition(stage.waiting_state());
            }
        }
        match event {
            LoadEvent::Loaded(LoadStage::Renderer) => {
                if self.transition(LoadState::EngineAReady) {
                    self.notify();
                }
            }
            LoadEvent::Loaded(LoadStage::Tracker) => {
                if self.transition(LoadState::BothReady) {
                    self.on_ready();
                }
            }
            LoadEvent::Failed { stage, reason } => {
                if self.load_state.borrow().is_failed() {
                    // onerror on a bundle that already timed out
                    tracing::debug!(?stage, %reason, "stage already failed");
                    return;
                }
                if self.transition(LoadState::Failed { stage, reason }) {
                    self.notify();
                }
            }
        }
    }

    fn on_ready(self: &Rc<Self>) {
        if !self.gate.open() {
            return;
        }
        tracing::info!("engines ready");
        // Observers render the scene markup before anything queries for it.
        self.notify();
        if self.torn_down.get() {
            return;
        }

        let session = Rc::downgrade(self);
        let on_event: Rc<dyn Fn(TargetEvent)> = Rc::new(move |event: TargetEvent| {
            if let Some(session) = session.upgrade() {
                session.on_target(event);
            }
        });
        self.bridge
            .attach(&self.host.scheduler, self.config.bridge_retry, on_event);

        let session = Rc::downgrade(self);
        self.layering.start(&self.host.scheduler, move || {
            if let Some(session) = session.upgrade() {
                session.notify();
            }
        });
    }

    fn on_target(&self, event: TargetEvent) {
        if self.torn_down.get() {
            return;
        }
        let visibility = event.visibility();
        tracing::debug!(?visibility, "target event");
        self.visibility.set(visibility);
        self.playback.on_visibility(visibility);
        self.notify();
    }

    fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        self.loader.cancel();
        self.bridge.detach();
        self.layering.stop();
        self.playback.close();
        tracing::info!("session torn down");
        self.notify();
        self.observers.borrow_mut().clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/controller.rs"]
mod tests;
