/// Convenience result type used across animreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy for recording operations.
///
/// Every variant is fatal for the recording that produced it. Transient encoder statuses are not
/// represented here: the drain loop logs them and keeps polling.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid encoder configuration (non-positive dimensions, frame rate or bit rate).
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing or malformed composition data.
    #[error("composition error: {0}")]
    Composition(String),

    /// The encoder/container protocol was violated (format changed twice, sample before start).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// An operation was called in a lifecycle state that does not allow it.
    #[error("invalid state: {0}")]
    State(String),

    /// Failure reported by the video encoder backend.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// Failure reported by the container writer backend.
    #[error("container error: {0}")]
    Container(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ReelError::Composition`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// Build a [`ReelError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`ReelError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Build a [`ReelError::Encoder`] value.
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Build a [`ReelError::Container`] value.
    pub fn container(msg: impl Into<String>) -> Self {
        Self::Container(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
