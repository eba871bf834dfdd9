//! Error taxonomy of the viewer.
//!
//! Every failure of a load attempt ends up as a [`ViewerError`]. All variants are
//! terminal for the attempt that produced them: the viewer moves to
//! [`crate::viewer::ViewerState::Failed`] and the host shows
//! [`ViewerError::user_message`]. Nothing here is retried automatically.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    /// The bytes of a remote or local model could not be fetched.
    #[error("Model source unavailable: {0}")]
    SourceUnavailable(String),

    /// The bytes were fetched but do not form a triangulated mesh.
    #[error("Could not decode mesh: {0}")]
    Decode(String),

    /// The mesh decoded fine but has no vertices.
    #[error("Mesh has no vertices")]
    EmptyMesh,

    /// A render resource could not be allocated by the backend.
    #[error("Graphics error: {0}")]
    Graphics(String),
}

impl ViewerError {
    /// Text shown by the host while the viewer is in the failed state.
    pub fn user_message(&self) -> String {
        match self {
            ViewerError::SourceUnavailable(_) => {
                "The model file could not be loaded.".to_string()
            }
            ViewerError::Decode(_) => "The model file could not be parsed.".to_string(),
            ViewerError::EmptyMesh => "The model file contains no geometry.".to_string(),
            ViewerError::Graphics(_) => "The model could not be displayed.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ViewerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ViewerError::SourceUnavailable(format!("request timed out: {}", err))
        } else if let Some(status) = err.status() {
            ViewerError::SourceUnavailable(format!("server answered {}", status))
        } else {
            ViewerError::SourceUnavailable(err.to_string())
        }
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(err: std::io::Error) -> Self {
        ViewerError::SourceUnavailable(err.to_string())
    }
}

impl From<tobj::LoadError> for ViewerError {
    fn from(err: tobj::LoadError) -> Self {
        ViewerError::Decode(format!("obj: {}", err))
    }
}

impl From<anyhow::Error> for ViewerError {
    fn from(err: anyhow::Error) -> Self {
        ViewerError::Graphics(format!("{:#}", err))
    }
}
