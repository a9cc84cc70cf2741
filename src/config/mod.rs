pub(crate) mod scene;
pub(crate) mod session;
