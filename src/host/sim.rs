//! Deterministic in-process host.
//!
//! `SimHost` stands in for the browser: a virtual clock drives timers, injected scripts stay
//! pending until the caller settles them, and elements exist only after the caller installs them.
//! Every observable side effect is appended to a shared [`HostCall`] trace.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::foundation::core::TargetEvent;
use crate::foundation::error::{ArError, ArResult};
use crate::host::api::{
    Document, Host, Layering, ListenerGuard, MediaElement, PlayError, RenderSurface, SceneRoot,
    Scheduler, ScriptInjector, ScriptOutcome, TimerId,
};

type Trace = Rc<RefCell<Vec<HostCall>>>;
type Tick = Rc<RefCell<Box<dyn FnMut()>>>;
type PlaySettle = Box<dyn FnOnce(Result<(), PlayError>)>;

/// One side effect observed by the simulated host.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    /// A script element was inserted.
    Inject {
        /// Script URL.
        src: String,
    },
    /// An interval was registered.
    SetInterval {
        /// Timer id.
        timer: u64,
        /// Period in milliseconds.
        period_ms: u64,
    },
    /// A timeout was registered.
    SetTimeout {
        /// Timer id.
        timer: u64,
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// A live timer was cancelled.
    ClearTimer {
        /// Timer id.
        timer: u64,
    },
    /// A listener was attached to the scene root.
    Listen {
        /// Event name.
        event: TargetEvent,
    },
    /// A listener was removed from the scene root.
    Unlisten {
        /// Event name.
        event: TargetEvent,
    },
    /// The media element's `muted` flag was written.
    SetMuted {
        /// New value.
        muted: bool,
    },
    /// `play()` was called on the media element.
    Play,
    /// `pause()` was called on the media element.
    Pause,
    /// Layering styles were applied to the render surface.
    ApplyLayering {
        /// Applied `z-index`.
        z_index: i32,
    },
}

enum SimTask {
    Interval { period: Duration, tick: Tick },
    Timeout(Box<dyn FnOnce()>),
}

struct SimTimer {
    due: Duration,
    task: SimTask,
}

enum Fire {
    Tick(Tick),
    Once(Box<dyn FnOnce()>),
}

struct PendingScript {
    src: String,
    settle: Option<Box<dyn FnOnce(ScriptOutcome)>>,
}

/// Simulated browser host: virtual clock, script injection and element registry.
pub struct SimHost {
    now: Cell<Duration>,
    next_timer: Cell<u64>,
    timers: RefCell<BTreeMap<TimerId, SimTimer>>,
    scripts: RefCell<Vec<PendingScript>>,
    scene: RefCell<Option<Rc<SimScene>>>,
    media: RefCell<Option<Rc<SimMedia>>>,
    surface: RefCell<Option<Rc<SimSurface>>>,
    scene_queries: Cell<usize>,
    media_queries: Cell<usize>,
    surface_queries: Cell<usize>,
    trace: Trace,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    /// Empty document at virtual time zero.
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            next_timer: Cell::new(1),
            timers: RefCell::new(BTreeMap::new()),
            scripts: RefCell::new(Vec::new()),
            scene: RefCell::new(None),
            media: RefCell::new(None),
            surface: RefCell::new(None),
            scene_queries: Cell::new(0),
            media_queries: Cell::new(0),
            surface_queries: Cell::new(0),
            trace: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Bundle this host as session collaborators.
    pub fn host(self: &Rc<Self>) -> Host {
        Host {
            scheduler: Rc::clone(self) as Rc<dyn Scheduler>,
            scripts: Rc::clone(self) as Rc<dyn ScriptInjector>,
            document: Rc::clone(self) as Rc<dyn Document>,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Advance the clock by `by`, firing due timers in (due time, id) order.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        loop {
            let next = self
                .timers
                .borrow()
                .iter()
                .filter(|(_, t)| t.due <= target)
                .min_by_key(|(id, t)| (t.due, **id))
                .map(|(id, t)| (*id, t.due));
            let Some((id, due)) = next else { break };
            self.now.set(due);
            self.fire(id);
        }
        self.now.set(target);
    }

    fn fire(&self, id: TimerId) {
        let fire = {
            let mut timers = self.timers.borrow_mut();
            let interval = match timers.get_mut(&id) {
                Some(SimTimer {
                    due,
                    task: SimTask::Interval { period, tick },
                }) => {
                    *due += *period;
                    Some(Rc::clone(tick))
                }
                Some(_) => None,
                None => return,
            };
            match interval {
                Some(tick) => Fire::Tick(tick),
                None => match timers.remove(&id) {
                    Some(SimTimer {
                        task: SimTask::Timeout(once),
                        ..
                    }) => Fire::Once(once),
                    _ => return,
                },
            }
        };
        match fire {
            Fire::Tick(tick) => (tick.borrow_mut())(),
            Fire::Once(once) => once(),
        }
    }

    /// Number of live intervals and timeouts.
    pub fn active_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// URLs of every injected script, in injection order.
    pub fn injected(&self) -> Vec<String> {
        self.scripts.borrow().iter().map(|s| s.src.clone()).collect()
    }

    /// Indices of injected scripts that have not settled yet.
    pub fn pending_scripts(&self) -> Vec<usize> {
        self.scripts
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.settle.is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Settle the script at `index` (injection order).
    pub fn resolve_script(&self, index: usize, outcome: ScriptOutcome) -> ArResult<()> {
        let settle = {
            let mut scripts = self.scripts.borrow_mut();
            let script = scripts
                .get_mut(index)
                .ok_or_else(|| ArError::host(format!("no injected script #{index}")))?;
            script
                .settle
                .take()
                .ok_or_else(|| ArError::host(format!("script #{index} already settled")))?
        };
        settle(outcome);
        Ok(())
    }

    /// Settle the oldest pending script; returns its index.
    pub fn resolve_next(&self, outcome: ScriptOutcome) -> ArResult<usize> {
        let index = self
            .pending_scripts()
            .first()
            .copied()
            .ok_or_else(|| ArError::host("no pending script to settle"))?;
        self.resolve_script(index, outcome)?;
        Ok(index)
    }

    /// Create the scene root, as the rendering engine would.
    pub fn install_scene(&self) -> Rc<SimScene> {
        let scene = Rc::new_cyclic(|me| SimScene {
            me: me.clone(),
            next_listener: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            trace: Rc::clone(&self.trace),
        });
        *self.scene.borrow_mut() = Some(Rc::clone(&scene));
        scene
    }

    /// Create the overlay video element with `id` (initially muted and paused).
    pub fn install_media(&self, id: &str) -> Rc<SimMedia> {
        let media = Rc::new(SimMedia {
            id: id.to_string(),
            muted: Cell::new(true),
            paused: Cell::new(true),
            mode: RefCell::new(PlayMode::Resolve),
            pending: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
            trace: Rc::clone(&self.trace),
        });
        *self.media.borrow_mut() = Some(Rc::clone(&media));
        media
    }

    /// Create the engine's drawing surface.
    pub fn install_surface(&self) -> Rc<SimSurface> {
        let surface = Rc::new(SimSurface {
            applied: RefCell::new(Vec::new()),
            trace: Rc::clone(&self.trace),
        });
        *self.surface.borrow_mut() = Some(Rc::clone(&surface));
        surface
    }

    /// Installed scene root, if any.
    pub fn scene(&self) -> Option<Rc<SimScene>> {
        self.scene.borrow().clone()
    }

    /// Installed media element, if any.
    pub fn media(&self) -> Option<Rc<SimMedia>> {
        self.media.borrow().clone()
    }

    /// Installed render surface, if any.
    pub fn surface(&self) -> Option<Rc<SimSurface>> {
        self.surface.borrow().clone()
    }

    /// Queries made against the scene root and media element.
    pub fn scene_queries(&self) -> usize {
        self.scene_queries.get() + self.media_queries.get()
    }

    /// Queries made against the render surface.
    pub fn surface_queries(&self) -> usize {
        self.surface_queries.get()
    }

    /// Snapshot of every recorded side effect.
    pub fn trace(&self) -> Vec<HostCall> {
        self.trace.borrow().clone()
    }

    fn record(&self, call: HostCall) {
        self.trace.borrow_mut().push(call);
    }

    fn alloc_timer(&self) -> TimerId {
        let id = self.next_timer.get();
        self.next_timer.set(id + 1);
        TimerId(id)
    }
}

impl Scheduler for SimHost {
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        let id = self.alloc_timer();
        self.timers.borrow_mut().insert(
            id,
            SimTimer {
                due: self.now.get() + period,
                task: SimTask::Interval {
                    period,
                    tick: Rc::new(RefCell::new(tick)),
                },
            },
        );
        self.record(HostCall::SetInterval {
            timer: id.0,
            period_ms: period.as_millis() as u64,
        });
        id
    }

    fn set_timeout(&self, delay: Duration, fire: Box<dyn FnOnce()>) -> TimerId {
        let id = self.alloc_timer();
        self.timers.borrow_mut().insert(
            id,
            SimTimer {
                due: self.now.get() + delay,
                task: SimTask::Timeout(fire),
            },
        );
        self.record(HostCall::SetTimeout {
            timer: id.0,
            delay_ms: delay.as_millis() as u64,
        });
        id
    }

    fn clear(&self, id: TimerId) {
        let removed = self.timers.borrow_mut().remove(&id);
        if removed.is_some() {
            self.record(HostCall::ClearTimer { timer: id.0 });
        }
    }
}

impl ScriptInjector for SimHost {
    fn inject(&self, src: &str, on_settled: Box<dyn FnOnce(ScriptOutcome)>) {
        self.scripts.borrow_mut().push(PendingScript {
            src: src.to_string(),
            settle: Some(on_settled),
        });
        self.record(HostCall::Inject {
            src: src.to_string(),
        });
    }
}

impl Document for SimHost {
    fn scene_root(&self) -> Option<Rc<dyn SceneRoot>> {
        self.scene_queries.set(self.scene_queries.get() + 1);
        self.scene().map(|s| s as Rc<dyn SceneRoot>)
    }

    fn media_element(&self, id: &str) -> Option<Rc<dyn MediaElement>> {
        self.media_queries.set(self.media_queries.get() + 1);
        self.media()
            .filter(|m| m.id == id)
            .map(|m| m as Rc<dyn MediaElement>)
    }

    fn render_surface(&self) -> Option<Rc<dyn RenderSurface>> {
        self.surface_queries.set(self.surface_queries.get() + 1);
        self.surface().map(|s| s as Rc<dyn RenderSurface>)
    }
}

struct SimListener {
    id: u64,
    event: TargetEvent,
    handler: Tick,
}

/// Simulated scene root that can emit tracker events.
pub struct SimScene {
    me: Weak<SimScene>,
    next_listener: Cell<u64>,
    listeners: RefCell<Vec<SimListener>>,
    trace: Trace,
}

impl SimScene {
    /// Dispatch `event` to its listeners; returns how many ran.
    pub fn emit(&self, event: TargetEvent) -> usize {
        let handlers: Vec<Tick> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.event == event)
            .map(|l| Rc::clone(&l.handler))
            .collect();
        for handler in &handlers {
            (handler.borrow_mut())();
        }
        handlers.len()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl SceneRoot for SimScene {
    fn listen(&self, event: TargetEvent, handler: Box<dyn FnMut()>) -> ListenerGuard {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push(SimListener {
            id,
            event,
            handler: Rc::new(RefCell::new(handler)),
        });
        self.trace.borrow_mut().push(HostCall::Listen { event });

        let scene = self.me.clone();
        ListenerGuard::new(move || {
            if let Some(scene) = scene.upgrade() {
                scene.listeners.borrow_mut().retain(|l| l.id != id);
                scene.trace.borrow_mut().push(HostCall::Unlisten { event });
            }
        })
    }
}

/// How the simulated element answers `play()`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "mode", content = "error", rename_all = "snake_case")]
pub enum PlayMode {
    /// Resolve immediately.
    #[default]
    Resolve,
    /// Keep the promise pending until [`SimMedia::settle_next_play`].
    Defer,
    /// Reject immediately with the given error.
    Reject(PlayError),
}

/// Call recorded on a [`SimMedia`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaCall {
    /// `muted = value`.
    SetMuted(bool),
    /// `play()`.
    Play,
    /// `pause()`.
    Pause,
}

/// Simulated video element.
pub struct SimMedia {
    id: String,
    muted: Cell<bool>,
    paused: Cell<bool>,
    mode: RefCell<PlayMode>,
    pending: RefCell<VecDeque<PlaySettle>>,
    calls: RefCell<Vec<MediaCall>>,
    trace: Trace,
}

impl SimMedia {
    /// Every call made on the element, in order.
    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.borrow().clone()
    }

    /// Only the `play()` / `pause()` calls, in order.
    pub fn transport_calls(&self) -> Vec<MediaCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, MediaCall::Play | MediaCall::Pause))
            .cloned()
            .collect()
    }

    /// Whether the element is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    /// Choose how later `play()` calls settle.
    pub fn set_play_mode(&self, mode: PlayMode) {
        *self.mode.borrow_mut() = mode;
    }

    /// Number of deferred `play()` promises still pending.
    pub fn pending_plays(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Settle the oldest deferred `play()`; returns false if none was pending.
    pub fn settle_next_play(&self, result: Result<(), PlayError>) -> bool {
        let settle = self.pending.borrow_mut().pop_front();
        match settle {
            Some(settle) => {
                if result.is_ok() {
                    self.paused.set(false);
                }
                settle(result);
                true
            }
            None => false,
        }
    }

    fn record(&self, call: MediaCall, host_call: HostCall) {
        self.calls.borrow_mut().push(call);
        self.trace.borrow_mut().push(host_call);
    }
}

impl MediaElement for SimMedia {
    fn muted(&self) -> bool {
        self.muted.get()
    }

    fn set_muted(&self, muted: bool) {
        self.muted.set(muted);
        self.record(MediaCall::SetMuted(muted), HostCall::SetMuted { muted });
    }

    fn play(&self, settled: PlaySettle) {
        self.record(MediaCall::Play, HostCall::Play);
        let mode = self.mode.borrow().clone();
        match mode {
            PlayMode::Resolve => {
                self.paused.set(false);
                settled(Ok(()));
            }
            PlayMode::Defer => self.pending.borrow_mut().push_back(settled),
            PlayMode::Reject(err) => settled(Err(err)),
        }
    }

    fn pause(&self) {
        self.record(MediaCall::Pause, HostCall::Pause);
        self.paused.set(true);
        // A pause interrupts any play() still pending, like HTMLMediaElement does.
        let interrupted: Vec<PlaySettle> = self.pending.borrow_mut().drain(..).collect();
        for settle in interrupted {
            settle(Err(PlayError::Aborted));
        }
    }
}

/// Simulated render surface.
pub struct SimSurface {
    applied: RefCell<Vec<Layering>>,
    trace: Trace,
}

impl SimSurface {
    /// Every layering correction applied, in order.
    pub fn applied(&self) -> Vec<Layering> {
        self.applied.borrow().clone()
    }
}

impl RenderSurface for SimSurface {
    fn apply_layering(&self, layering: &Layering) {
        self.applied.borrow_mut().push(*layering);
        self.trace.borrow_mut().push(HostCall::ApplyLayering {
            z_index: layering.z_index,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/sim.rs"]
mod tests;
