use std::fmt::Write as _;

use crate::foundation::error::{ArError, ArResult};

const DEFAULT_VIDEO_SRC: &str = "https://res.cloudinary.com/dddnxiqpq/video/upload/f_auto,vc_auto,q_auto,w_1280/Road_Safety_1_vph2hz.mp4";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Declarative scene handed to the engines.
///
/// The controller never interprets these values; they only shape the markup produced by
/// [`SceneConfig::to_markup`].
pub struct SceneConfig {
    /// Compiled image-target descriptor served by the app.
    pub image_target_src: String,
    /// Index of the target inside the descriptor.
    pub target_index: u32,
    /// Optional tracker stabilization parameters.
    pub filter: Option<FilterTuning>,
    /// The overlay clip.
    pub video: VideoSource,
    /// Size of the video plane in target units.
    pub plane: PlaneSize,
    /// How the video is attached to the target anchor.
    pub anchoring: AnchorStrategy,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            image_target_src: "/targets.mind".to_string(),
            target_index: 0,
            filter: None,
            video: VideoSource::default(),
            plane: PlaneSize::default(),
            anchoring: AnchorStrategy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Tracker stabilization tuning, written into the `mindar-image` attribute.
///
/// Unset fields keep the tracker's own defaults.
pub struct FilterTuning {
    /// One-euro filter minimum cutoff (`filterMinCF`). Lower values smooth more.
    pub min_cutoff: Option<f64>,
    /// One-euro filter speed coefficient (`filterBeta`). Lower values lag more on fast motion.
    pub beta: Option<f64>,
    /// Frames without detection before `targetLost` fires (`missTolerance`).
    pub miss_tolerance: Option<u32>,
    /// Frames of detection before `targetFound` fires (`warmupTolerance`).
    pub warmup_tolerance: Option<u32>,
}

impl FilterTuning {
    /// `(key, value)` pairs in the tracker's attribute syntax, set fields only.
    pub fn declarations(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(v) = self.min_cutoff {
            out.push(("filterMinCF", v.to_string()));
        }
        if let Some(v) = self.beta {
            out.push(("filterBeta", v.to_string()));
        }
        if let Some(v) = self.miss_tolerance {
            out.push(("missTolerance", v.to_string()));
        }
        if let Some(v) = self.warmup_tolerance {
            out.push(("warmupTolerance", v.to_string()));
        }
        out
    }

    fn validate(&self) -> ArResult<()> {
        for (name, value) in [("min_cutoff", self.min_cutoff), ("beta", self.beta)] {
            if value.is_some_and(|v| !(v.is_finite() && v >= 0.0)) {
                return Err(ArError::validation(format!(
                    "scene.filter.{name} must be finite and >= 0"
                )));
            }
        }
        for (name, value) in [
            ("miss_tolerance", self.miss_tolerance),
            ("warmup_tolerance", self.warmup_tolerance),
        ] {
            if value == Some(0) {
                return Err(ArError::validation(format!("scene.filter.{name} must be > 0")));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
/// The single overlay video element.
pub struct VideoSource {
    /// DOM id; the controller looks the element up by it.
    pub id: String,
    /// Clip URL.
    pub src: String,
    /// Loop playback.
    pub looped: bool,
    /// Start muted. Must stay true so unattended autoplay is allowed.
    pub muted: bool,
    /// Play inline on mobile instead of going fullscreen.
    pub plays_inline: bool,
    /// `crossorigin` attribute; needed to texture a WebGL plane from another origin.
    pub cross_origin: Option<String>,
}

impl Default for VideoSource {
    fn default() -> Self {
        Self {
            id: "ar-video".to_string(),
            src: DEFAULT_VIDEO_SRC.to_string(),
            looped: true,
            muted: true,
            plays_inline: true,
            cross_origin: Some("anonymous".to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
/// Width/height of the video plane.
pub struct PlaneSize {
    /// Width in target units (1 = target width).
    pub width: f64,
    /// Height in target units.
    pub height: f64,
}

impl Default for PlaneSize {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 0.6,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Where the video plane hangs in the target anchor.
pub enum AnchorStrategy {
    /// Video plane is a direct child of the anchor.
    #[default]
    Direct,
    /// Video sits on an invisible plane that absorbs pose jitter.
    StabilizedPlane {
        /// Opacity of the carrier plane, usually 0.
        #[serde(default)]
        opacity: f64,
    },
}

impl SceneConfig {
    /// Check values the engines would otherwise reject silently.
    pub fn validate(&self) -> ArResult<()> {
        if self.image_target_src.trim().is_empty() {
            return Err(ArError::validation("scene.image_target_src must not be empty"));
        }
        if self.video.id.trim().is_empty() || self.video.id.contains(char::is_whitespace) {
            return Err(ArError::validation(
                "scene.video.id must be a non-empty id without whitespace",
            ));
        }
        if self.video.src.trim().is_empty() {
            return Err(ArError::validation("scene.video.src must not be empty"));
        }
        if !self.video.muted {
            return Err(ArError::validation(
                "scene.video.muted must be true: unmuting is reserved for the user gesture",
            ));
        }
        let PlaneSize { width, height } = self.plane;
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(ArError::validation(
                "scene.plane width/height must be finite and > 0",
            ));
        }
        if let AnchorStrategy::StabilizedPlane { opacity } = self.anchoring {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ArError::validation(
                    "scene.anchoring.opacity must be in [0, 1]",
                ));
            }
        }
        if let Some(f) = &self.filter {
            f.validate()?;
        }
        Ok(())
    }

    /// Engine markup for this scene; the scene root sits at `z_index`.
    pub fn to_markup(&self, z_index: i32) -> String {
        let mut tracker = format!("imageTargetSrc: {};", self.image_target_src);
        if let Some(f) = &self.filter {
            for (key, value) in f.declarations() {
                let _ = write!(tracker, " {key}: {value};");
            }
        }

        let v = &self.video;
        let mut video = format!(
            r#"<video id="{}" src="{}" preload="auto""#,
            escape_attr(&v.id),
            escape_attr(&v.src)
        );
        for (on, flag) in [
            (v.looped, " loop"),
            (v.muted, " muted"),
            (v.plays_inline, " playsinline"),
        ] {
            if on {
                video.push_str(flag);
            }
        }
        if let Some(co) = &v.cross_origin {
            let _ = write!(video, r#" crossorigin="{}""#, escape_attr(co));
        }
        video.push_str("></video>");

        let PlaneSize { width, height } = self.plane;
        let anchored = match self.anchoring {
            AnchorStrategy::Direct => format!(
                r##"<a-video src="#{}" width="{width}" height="{height}" position="0 0 0"></a-video>"##,
                escape_attr(&v.id)
            ),
            AnchorStrategy::StabilizedPlane { opacity } => format!(
                r##"<a-plane width="{width}" height="{height}" position="0 0 0" material="transparent: true; opacity: {opacity}"><a-video src="#{}" width="{width}" height="{height}" position="0 0 0.01"></a-video></a-plane>"##,
                escape_attr(&v.id)
            ),
        };

        format!(
            concat!(
                r#"<a-scene mindar-image="{tracker}" embedded vr-mode-ui="enabled: false" "#,
                r#"device-orientation-permission-ui="enabled: true" "#,
                r#"style="position: fixed; inset: 0; z-index: {z}">"#,
                "<a-assets>{video}</a-assets>",
                r#"<a-camera position="0 0 0" look-controls="enabled: false"></a-camera>"#,
                r#"<a-entity mindar-image-target="targetIndex: {index}">{anchored}</a-entity>"#,
                "</a-scene>"
            ),
            tracker = escape_attr(&tracker),
            z = z_index,
            video = video,
            index = self.target_index,
            anchored = anchored,
        )
    }
}

pub(crate) fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/config/scene.rs"]
mod tests;
