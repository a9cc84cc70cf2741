//! Scripted sessions against [`SimHost`].
//!
//! A replay script is a JSON list of host events (script completions, clock advances, elements
//! appearing, tracker notifications, clicks). [`replay`] mounts a session, applies the steps in
//! order and reports what the session did to the host.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use crate::config::session::SessionConfig;
use crate::foundation::core::TargetEvent;
use crate::foundation::error::{ArError, ArResult};
use crate::host::api::{PlayError, ScriptOutcome};
use crate::host::sim::{HostCall, PlayMode, SimHost, SimMedia};
use crate::session::controller::{ArSession, SessionSnapshot};
use crate::session::overlay::OverlayView;
use crate::session::playback::UserGesture;

/// One host-side event in a replay script.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    /// Settle an injected script; the oldest pending one when `index` is omitted.
    ResolveScript {
        /// Injection index.
        #[serde(default)]
        index: Option<usize>,
        /// How the script settles.
        outcome: ScriptOutcome,
    },
    /// Move the virtual clock forward.
    Advance {
        /// Milliseconds to advance.
        ms: u64,
    },
    /// The rendering engine creates the scene root.
    InstallScene,
    /// The overlay video element appears (with the configured id).
    InstallMedia,
    /// The rendering engine injects its drawing surface.
    InstallSurface,
    /// The tracker dispatches a target notification.
    Emit {
        /// Which notification.
        event: TargetEvent,
    },
    /// The user clicks the mute control.
    Click,
    /// The user clicks the retry control.
    Retry,
    /// Choose how the video element answers later `play()` calls.
    SetPlayMode {
        /// Answer mode.
        mode: PlayMode,
    },
    /// Settle the oldest deferred `play()`; success when `error` is omitted.
    SettlePlay {
        /// Rejection reason.
        #[serde(default)]
        error: Option<PlayError>,
    },
    /// Tear the session down.
    Teardown,
}

/// Ordered replay steps.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    /// Steps, applied in order after mounting.
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    /// Parse a script from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ArResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ArError::serde(format!("parse replay script JSON: {e}")))
    }

    /// Parse a script from a JSON string.
    pub fn from_json_str(s: &str) -> ArResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse a script from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ArResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ArError::validation(format!("open replay script '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }
}

/// What a replayed session did.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ReplayReport {
    /// Every side effect on the simulated host, in order.
    pub trace: Vec<HostCall>,
    /// Session state after the last step.
    pub snapshot: SessionSnapshot,
    /// Widget view after the last step.
    pub overlay: OverlayView,
}

/// Mount a session on a fresh [`SimHost`] and apply `script`.
///
/// Steps that need an element which was never installed, or a script that is not pending, fail
/// with [`ArError::Host`].
#[tracing::instrument(skip_all, fields(steps = script.steps.len()))]
pub fn replay(config: SessionConfig, script: &ReplayScript) -> ArResult<ReplayReport> {
    let sim = Rc::new(SimHost::new());
    let media_id = config.scene.video.id.clone();
    let session = ArSession::new(config, sim.host())?;
    session.mount();

    for (i, step) in script.steps.iter().enumerate() {
        tracing::debug!(step = i, ?step, "replay step");
        apply(&sim, &session, &media_id, step)
            .map_err(|e| ArError::host(format!("replay step #{i} ({step:?}): {e}")))?;
    }

    Ok(ReplayReport {
        trace: sim.trace(),
        snapshot: session.snapshot(),
        overlay: session.overlay(),
    })
}

fn apply(sim: &SimHost, session: &ArSession, media_id: &str, step: &ReplayStep) -> ArResult<()> {
    match step {
        ReplayStep::ResolveScript { index, outcome } => match index {
            Some(index) => sim.resolve_script(*index, outcome.clone())?,
            None => {
                sim.resolve_next(outcome.clone())?;
            }
        },
        ReplayStep::Advance { ms } => sim.advance(Duration::from_millis(*ms)),
        ReplayStep::InstallScene => {
            sim.install_scene();
        }
        ReplayStep::InstallMedia => {
            sim.install_media(media_id);
        }
        ReplayStep::InstallSurface => {
            sim.install_surface();
        }
        ReplayStep::Emit { event } => {
            let scene = sim
                .scene()
                .ok_or_else(|| ArError::host("no scene root installed"))?;
            let delivered = scene.emit(*event);
            tracing::debug!(?event, delivered, "emitted");
        }
        ReplayStep::Click => {
            let preference = session.toggle_audio(UserGesture::within_handler());
            tracing::debug!(?preference, "clicked mute control");
        }
        ReplayStep::Retry => session.retry()?,
        ReplayStep::SetPlayMode { mode } => media(sim)?.set_play_mode(mode.clone()),
        ReplayStep::SettlePlay { error } => {
            let result = match error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            };
            if !media(sim)?.settle_next_play(result) {
                return Err(ArError::host("no deferred play() to settle"));
            }
        }
        ReplayStep::Teardown => session.teardown(),
    }
    Ok(())
}

fn media(sim: &SimHost) -> ArResult<Rc<SimMedia>> {
    sim.media()
        .ok_or_else(|| ArError::host("no video element installed"))
}

#[cfg(test)]
#[path = "../../tests/unit/host/replay.rs"]
mod tests;
