//! arclip is the session lifecycle controller for an image-tracked AR video overlay.
//!
//! A page shows the camera feed, an external tracking engine detects a printed image target, and
//! a video clip is anchored to it with a mute toggle on top. arclip owns the part of that which is
//! easy to get wrong:
//!
//! 1. **Load**: inject the rendering engine, then the tracking extension, strictly in order.
//! 2. **Gate**: open the [`ReadinessGate`] once, after both executed. Nothing engine-owned is
//!    queried before that.
//! 3. **Bridge**: subscribe to `targetFound` / `targetLost` on the scene root and turn them into
//!    play / pause.
//! 4. **Layer**: poll for the engine's canvas and pin it beneath the overlay, once.
//! 5. **Play**: keep mute and transport state consistent with visibility and the browser's
//!    user-gesture rule ([`UserGesture`]).
//!
//! All browser access goes through the host seam ([`Scheduler`], [`ScriptInjector`],
//! [`Document`]). [`SimHost`] implements it deterministically for tests and for the `arclip
//! replay` command; the `web` feature adds a `web-sys` implementation and the `ArWidget`
//! JavaScript entry point on `wasm32`.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Single-threaded**: shared state is `Rc` / `RefCell`; callbacks hold `Weak` references.
//! - **Failures are state**: a stalled load or a rejected `play()` shows up in
//!   [`SessionSnapshot`], never as a panic or an exception thrown into the page.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod foundation;
mod host;
mod schedule;
mod session;

pub use config::scene::{AnchorStrategy, FilterTuning, PlaneSize, SceneConfig, VideoSource};
pub use config::session::{
    DEFAULT_RENDERER_SRC, DEFAULT_TRACKER_SRC, EngineBundles, SessionConfig,
};
pub use foundation::core::{
    AudioPreference, LoadStage, LoadState, PlaybackIssue, TargetEvent, TargetVisibility,
};
pub use foundation::error::{ArError, ArResult};
pub use host::api::{
    Document, Host, Layering, ListenerGuard, MediaElement, PlayError, RenderSurface, SceneRoot,
    Scheduler, ScriptInjector, ScriptOutcome, TimerId,
};
pub use host::replay::{ReplayReport, ReplayScript, ReplayStep, replay};
pub use host::sim::{HostCall, MediaCall, PlayMode, SimHost, SimMedia, SimScene, SimSurface};
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use host::web::ArWidget;
pub use schedule::poll::{PollGuard, PollPolicy, poll_until};
pub use session::controller::{ArSession, SessionSnapshot};
pub use session::gate::ReadinessGate;
pub use session::overlay::{
    ActiveOverlay, MUTE_CONTROL_ID, MuteIcon, OverlayView, RETRY_CONTROL_ID,
};
pub use session::playback::UserGesture;
