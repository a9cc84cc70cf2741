/// One of the two external engine bundles, in load order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    /// The rendering engine (engine A). Must be executable before the tracker loads.
    Renderer,
    /// The image-tracking extension (engine B), which augments the renderer.
    Tracker,
}

impl LoadStage {
    /// Both stages in the order they must be loaded.
    pub const ORDER: [LoadStage; 2] = [LoadStage::Renderer, LoadStage::Tracker];

    /// Stage that loads after this one, if any.
    pub fn next(self) -> Option<LoadStage> {
        match self {
            LoadStage::Renderer => Some(LoadStage::Tracker),
            LoadStage::Tracker => None,
        }
    }

    /// Load state the session is in while this stage is outstanding.
    pub fn waiting_state(self) -> LoadState {
        match self {
            LoadStage::Renderer => LoadState::Pending,
            LoadStage::Tracker => LoadState::EngineAReady,
        }
    }
}

/// Progress of engine loading for one session.
///
/// Moves forward only: `Pending -> EngineAReady -> BothReady`. `Failed` may be entered from either
/// loading state; [`crate::ArSession::retry`] returns to the waiting state of the failed stage.
/// Once `BothReady` is reached it never changes again.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    /// Nothing has finished loading yet.
    #[default]
    Pending,
    /// The rendering engine executed; the tracker is loading.
    EngineAReady,
    /// Both engines executed. Scene-dependent work may run.
    BothReady,
    /// A stage errored or timed out.
    Failed {
        /// Stage that did not complete.
        stage: LoadStage,
        /// Human-readable cause.
        reason: String,
    },
}

impl LoadState {
    /// True once both engines are executable.
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::BothReady)
    }

    /// True while a failed stage is awaiting [`crate::ArSession::retry`].
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed { .. })
    }

    fn rank(&self) -> u8 {
        match self {
            LoadState::Pending => 0,
            LoadState::EngineAReady => 1,
            LoadState::BothReady => 2,
            LoadState::Failed { stage, .. } => stage.waiting_state().rank(),
        }
    }

    /// Whether moving from `self` to `next` respects the forward-only ordering.
    pub fn can_become(&self, next: &LoadState) -> bool {
        match (self, next) {
            (LoadState::BothReady, _) => false,
            (LoadState::Failed { stage, .. }, next) => *next == stage.waiting_state(),
            (cur, LoadState::Failed { stage, .. }) => *cur == stage.waiting_state(),
            (cur, next) => next.rank() > cur.rank(),
        }
    }
}

/// Whether the tracker currently sees the printed target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetVisibility {
    /// Target not in view (initial state).
    #[default]
    Lost,
    /// Target detected and tracked.
    Found,
}

/// The user's mute choice. Only a user gesture may change it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioPreference {
    /// Muted (initial state, required for unattended autoplay).
    #[default]
    Muted,
    /// Sound on.
    Unmuted,
}

impl AudioPreference {
    /// The opposite preference.
    pub fn toggled(self) -> Self {
        match self {
            AudioPreference::Muted => AudioPreference::Unmuted,
            AudioPreference::Unmuted => AudioPreference::Muted,
        }
    }

    /// Value for the media element's `muted` flag.
    pub fn is_muted(self) -> bool {
        matches!(self, AudioPreference::Muted)
    }
}

/// Notification emitted by the tracking engine on the scene root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEvent {
    /// The target entered the camera view.
    Found,
    /// The target left the camera view.
    Lost,
}

impl TargetEvent {
    /// DOM event name dispatched by the tracker.
    pub fn dom_name(self) -> &'static str {
        match self {
            TargetEvent::Found => "targetFound",
            TargetEvent::Lost => "targetLost",
        }
    }

    /// Visibility implied by this event.
    pub fn visibility(self) -> TargetVisibility {
        match self {
            TargetEvent::Found => TargetVisibility::Found,
            TargetEvent::Lost => TargetVisibility::Lost,
        }
    }
}

/// Why the last `play()` call did not take effect.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "issue", content = "detail", rename_all = "snake_case")]
pub enum PlaybackIssue {
    /// No outstanding problem.
    #[default]
    None,
    /// The browser refused playback outside a user gesture.
    GestureRequired,
    /// Playback failed for another reason.
    Failed(String),
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
