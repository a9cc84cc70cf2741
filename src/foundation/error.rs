/// Convenience result type used across arclip.
pub type ArResult<T> = Result<T, ArError>;

/// Top-level error taxonomy used by the session APIs.
///
/// Runtime failures inside a mounted session (stalled engine loads, rejected `play()` calls,
/// missing elements) are reported as session state, not as errors. `ArError` covers the edges:
/// configuration, replay scripts, host construction and caller misuse.
#[derive(thiserror::Error, Debug)]
pub enum ArError {
    /// Invalid user-provided configuration or script data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Engine bundle loading could not be started or resumed.
    #[error("load error: {0}")]
    Load(String),

    /// The host environment (document, window, simulated host) rejected a request.
    #[error("host error: {0}")]
    Host(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArError {
    /// Build an [`ArError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`ArError::Load`] value.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Build an [`ArError::Host`] value.
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Build an [`ArError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
