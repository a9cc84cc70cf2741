use crate::config::scene::escape_attr;
use crate::config::session::SessionConfig;
use crate::foundation::core::{AudioPreference, LoadStage, LoadState, PlaybackIssue};
use crate::session::controller::SessionSnapshot;

/// DOM id of the mute/unmute button.
pub const MUTE_CONTROL_ID: &str = "ar-mute-toggle";
/// DOM id of the retry button shown after a failed load.
pub const RETRY_CONTROL_ID: &str = "ar-retry";

/// Icon on the mute control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MuteIcon {
    /// Speaker with a cross: audio is off, clicking unmutes.
    Muted,
    /// Speaker with waves: audio is on, clicking mutes.
    Unmuted,
}

impl MuteIcon {
    /// Icon for `preference`.
    pub fn for_preference(preference: AudioPreference) -> Self {
        match preference {
            AudioPreference::Muted => MuteIcon::Muted,
            AudioPreference::Unmuted => MuteIcon::Unmuted,
        }
    }

    /// Accessible label describing what a click does.
    pub fn action_label(self) -> &'static str {
        match self {
            MuteIcon::Muted => "Unmute",
            MuteIcon::Unmuted => "Mute",
        }
    }

    fn glyph(self) -> &'static str {
        match self {
            MuteIcon::Muted => "\u{1F507}",
            MuteIcon::Unmuted => "\u{1F50A}",
        }
    }
}

/// The mute control plus the scene it floats above.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ActiveOverlay {
    /// Icon reflecting the audio preference.
    pub icon: MuteIcon,
    /// Stacking order of the control.
    pub z_index: i32,
    /// Playback was blocked until the user taps.
    pub gesture_hint: bool,
    /// Engine markup passed through from the scene configuration.
    pub scene_markup: String,
}

/// What the widget shows.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum OverlayView {
    /// Engines still loading: a text indicator and nothing else.
    Loading {
        /// Indicator text.
        text: String,
    },
    /// A load failed or stalled.
    Failed {
        /// What went wrong.
        message: String,
    },
    /// Engines ready.
    Active(ActiveOverlay),
}

impl OverlayView {
    /// View for the given session state.
    pub fn from_snapshot(snapshot: &SessionSnapshot, config: &SessionConfig) -> Self {
        match &snapshot.load_state {
            LoadState::BothReady => OverlayView::Active(ActiveOverlay {
                icon: MuteIcon::for_preference(snapshot.audio),
                z_index: config.overlay_z_index,
                gesture_hint: snapshot.playback_issue == PlaybackIssue::GestureRequired,
                scene_markup: config.scene.to_markup(config.surface_z_index),
            }),
            LoadState::Failed { stage, reason } => {
                let what = match stage {
                    LoadStage::Renderer => "rendering engine",
                    LoadStage::Tracker => "image tracker",
                };
                OverlayView::Failed {
                    message: format!("Could not load the {what} ({reason})."),
                }
            }
            LoadState::Pending | LoadState::EngineAReady => OverlayView::Loading {
                text: config.loading_text.clone(),
            },
        }
    }

    /// Full widget markup.
    pub fn to_html(&self) -> String {
        match self {
            OverlayView::Loading { text } => format!(
                r#"<div class="ar-loading" style="height: 100vh; display: flex; align-items: center; justify-content: center; font-size: 18px">{}</div>"#,
                escape_attr(text)
            ),
            OverlayView::Failed { message } => format!(
                r#"<div class="ar-failed" style="height: 100vh; display: flex; flex-direction: column; align-items: center; justify-content: center; gap: 12px; font-size: 18px"><p>{}</p><button id="{RETRY_CONTROL_ID}" type="button">Retry</button></div>"#,
                escape_attr(message)
            ),
            OverlayView::Active(active) => format!(
                r#"<div id="ar-root" style="position: fixed; inset: 0; overflow: hidden"><div class="ar-controls" style="position: fixed; bottom: 20px; left: 20px; z-index: {}; pointer-events: auto">{}</div>{}</div>"#,
                active.z_index,
                active.control_html(),
                active.scene_markup
            ),
        }
    }
}

impl ActiveOverlay {
    /// Markup of the mute button alone, for in-place updates.
    pub fn control_html(&self) -> String {
        let hint = if self.gesture_hint {
            r#" data-hint="tap-to-play""#
        } else {
            ""
        };
        format!(
            r#"<button id="{MUTE_CONTROL_ID}" type="button" aria-label="{}"{hint} style="width: 48px; height: 48px; border-radius: 50%; border: none; background: rgba(0,0,0,0.8); color: #fff; display: flex; align-items: center; justify-content: center; font-size: 20px">{}</button>"#,
            self.icon.action_label(),
            self.icon.glyph()
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/overlay.rs"]
mod tests;
