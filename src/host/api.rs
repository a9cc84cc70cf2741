use std::rc::Rc;
use std::time::Duration;

use crate::foundation::core::TargetEvent;

/// Handle to a timer registered with a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct TimerId(pub u64);

/// Event-loop timers (`setInterval` / `setTimeout` in a browser).
///
/// Callbacks run on the same thread that registered them, never re-entrantly from inside
/// `set_*`. Clearing an unknown or already-fired id is a no-op.
pub trait Scheduler {
    /// Run `tick` every `period` until cleared.
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerId;
    /// Run `fire` once after `delay` unless cleared first.
    fn set_timeout(&self, delay: Duration, fire: Box<dyn FnOnce()>) -> TimerId;
    /// Cancel a pending interval or timeout.
    fn clear(&self, id: TimerId);
}

/// Result of executing an injected script.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ScriptOutcome {
    /// The script was fetched and executed.
    Loaded,
    /// The script element reported an error.
    Failed(String),
}

/// Inserts executable script references into the document.
pub trait ScriptInjector {
    /// Insert one `<script src=...>` and call `on_settled` once it executed or failed.
    ///
    /// Every call inserts a new element; callers are responsible for loading each bundle once.
    fn inject(&self, src: &str, on_settled: Box<dyn FnOnce(ScriptOutcome)>);
}

/// Accessors for engine-owned elements. Each call is a fresh query; `None` means "not there yet".
pub trait Document {
    /// The engine's scene root (`a-scene`).
    fn scene_root(&self) -> Option<Rc<dyn SceneRoot>>;
    /// The overlay video element with the given id.
    fn media_element(&self, id: &str) -> Option<Rc<dyn MediaElement>>;
    /// The drawing surface the rendering engine injected.
    fn render_surface(&self) -> Option<Rc<dyn RenderSurface>>;
}

/// Event target for tracker notifications.
pub trait SceneRoot {
    /// Subscribe `handler` to `event`. The subscription lasts as long as the returned guard.
    fn listen(&self, event: TargetEvent, handler: Box<dyn FnMut()>) -> ListenerGuard;
}

/// Why a `play()` request was rejected.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum PlayError {
    /// Autoplay policy: playback with sound needs a user gesture (`NotAllowedError`).
    #[error("play() requires a user gesture")]
    NotAllowed,
    /// A later `pause()` interrupted the pending play (`AbortError`).
    #[error("play() was interrupted by pause()")]
    Aborted,
    /// Any other rejection (unsupported source, network, ...).
    #[error("play() failed: {0}")]
    Other(String),
}

/// The overlay video element.
///
/// `play` and `pause` are idempotent on the element: playing while playing or pausing while
/// paused has no effect.
pub trait MediaElement {
    /// Current `muted` flag.
    fn muted(&self) -> bool;
    /// Set the `muted` flag.
    fn set_muted(&self, muted: bool);
    /// Request playback; `settled` receives the outcome of the play promise.
    fn play(&self, settled: Box<dyn FnOnce(Result<(), PlayError>)>);
    /// Pause playback. Never fails.
    fn pause(&self);
}

/// Stacking rules applied to the engine's drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Layering {
    /// CSS `z-index`; must sit below the UI overlay's.
    pub z_index: i32,
}

impl Layering {
    /// CSS declarations pinning the surface to the viewport at `z_index`.
    pub fn declarations(&self) -> [(&'static str, String); 3] {
        [
            ("position", "fixed".to_string()),
            ("inset", "0".to_string()),
            ("z-index", self.z_index.to_string()),
        ]
    }
}

/// The engine-injected drawing surface (`canvas`).
pub trait RenderSurface {
    /// Apply `layering` to the surface's inline style.
    fn apply_layering(&self, layering: &Layering);
}

/// Keeps an event subscription alive; dropping it detaches the listener.
#[must_use = "dropping the guard removes the listener"]
pub struct ListenerGuard {
    detach: Option<Box<dyn FnOnce()>>,
}

impl ListenerGuard {
    /// Guard that runs `detach` when dropped.
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// The collaborators a session talks to.
#[derive(Clone)]
pub struct Host {
    /// Timers.
    pub scheduler: Rc<dyn Scheduler>,
    /// Script injection.
    pub scripts: Rc<dyn ScriptInjector>,
    /// Element queries.
    pub document: Rc<dyn Document>,
}
