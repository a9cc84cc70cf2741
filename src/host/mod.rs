pub(crate) mod api;
pub(crate) mod replay;
pub(crate) mod sim;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub(crate) mod web;
