//! Backend failure taxonomy

use thiserror::Error;

/// Failure of a backend round: the call itself or its event stream.
///
/// The display text is what callers inspect for content-filter markers, so
/// variants carry the backend's own message verbatim.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Backend stream interrupted: {0}")]
    Stream(String),

    #[error("Backend reported an error: {0}")]
    Remote(String),
}

impl BackendError {
    /// Whether the backend rejected the content through its safety filter.
    pub fn is_content_filtered(&self) -> bool {
        self.to_string().to_lowercase().contains("content_filter")
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}
