use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::config::scene::SceneConfig;
use crate::foundation::core::LoadStage;
use crate::foundation::error::{ArError, ArResult};
use crate::schedule::poll::PollPolicy;

/// Rendering engine bundle loaded first.
pub const DEFAULT_RENDERER_SRC: &str = "https://aframe.io/releases/1.4.2/aframe.min.js";
/// Image-tracking extension loaded second.
pub const DEFAULT_TRACKER_SRC: &str =
    "https://cdn.jsdelivr.net/npm/mind-ar@1.2.5/dist/mindar-image-aframe.prod.js";

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Script locators for the two engines, in load order.
pub struct EngineBundles {
    /// Rendering engine URL.
    pub renderer: String,
    /// Tracking extension URL. Augments the renderer, so it loads strictly after it.
    pub tracker: String,
}

impl Default for EngineBundles {
    fn default() -> Self {
        Self {
            renderer: DEFAULT_RENDERER_SRC.to_string(),
            tracker: DEFAULT_TRACKER_SRC.to_string(),
        }
    }
}

impl EngineBundles {
    /// URL for `stage`.
    pub fn locator(&self, stage: LoadStage) -> &str {
        match stage {
            LoadStage::Renderer => &self.renderer,
            LoadStage::Tracker => &self.tracker,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Everything a session needs besides its host.
pub struct SessionConfig {
    /// Engine scripts.
    pub engines: EngineBundles,
    /// Per-script load deadline in milliseconds; `null` waits forever.
    pub load_timeout_ms: Option<u64>,
    /// Interval of the render-surface layering watchdog.
    pub layer_poll_ms: u64,
    /// Re-subscription policy when the scene root or video is missing at readiness.
    pub bridge_retry: PollPolicy,
    /// Stacking order given to the engine's drawing surface.
    pub surface_z_index: i32,
    /// Stacking order of the UI overlay; must exceed `surface_z_index`.
    pub overlay_z_index: i32,
    /// Text shown while the engines load.
    pub loading_text: String,
    /// CSS selector for the scene root.
    pub scene_selector: String,
    /// CSS selector for the engine's drawing surface.
    pub surface_selector: String,
    /// Declarative scene.
    pub scene: SceneConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engines: EngineBundles::default(),
            load_timeout_ms: Some(20_000),
            layer_poll_ms: 100,
            bridge_retry: PollPolicy::bounded(100, 50),
            surface_z_index: 1,
            overlay_z_index: 99_999,
            loading_text: "Loading AR…".to_string(),
            scene_selector: "a-scene".to_string(),
            surface_selector: "canvas".to_string(),
            scene: SceneConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from a JSON reader. Missing fields take their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> ArResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ArError::serde(format!("parse session config JSON: {e}")))
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(s: &str) -> ArResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ArResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ArError::validation(format!("open session config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ArResult<()> {
        for stage in LoadStage::ORDER {
            if self.engines.locator(stage).trim().is_empty() {
                return Err(ArError::validation(format!(
                    "engines.{stage:?} locator must not be empty"
                )));
            }
        }
        if self.engines.renderer == self.engines.tracker {
            return Err(ArError::validation(
                "engines.renderer and engines.tracker must be different bundles",
            ));
        }
        if self.load_timeout_ms == Some(0) {
            return Err(ArError::validation(
                "load_timeout_ms must be > 0 (use null to disable)",
            ));
        }
        if self.layer_poll_ms == 0 {
            return Err(ArError::validation("layer_poll_ms must be > 0"));
        }
        if self.bridge_retry.interval_ms == 0 && !self.bridge_retry.is_disabled() {
            return Err(ArError::validation("bridge_retry.interval_ms must be > 0"));
        }
        if self.overlay_z_index <= self.surface_z_index {
            return Err(ArError::validation(format!(
                "overlay_z_index ({}) must be above surface_z_index ({})",
                self.overlay_z_index, self.surface_z_index
            )));
        }
        if self.scene_selector.trim().is_empty() || self.surface_selector.trim().is_empty() {
            return Err(ArError::validation("element selectors must not be empty"));
        }
        self.scene.validate()
    }

    /// Load deadline as a [`Duration`].
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    /// Watchdog policy: poll every `layer_poll_ms` until found or torn down.
    pub fn layer_poll(&self) -> PollPolicy {
        PollPolicy::unbounded(self.layer_poll_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/session.rs"]
mod tests;
