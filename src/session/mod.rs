pub(crate) mod bridge;
pub(crate) mod controller;
pub(crate) mod gate;
pub(crate) mod layering;
pub(crate) mod loader;
pub(crate) mod overlay;
pub(crate) mod playback;
