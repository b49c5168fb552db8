use std::{path::PathBuf, time::Duration};

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a classifier backend. Every variant surfaces to the user as
/// the same inference error reply; the detail is only logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model file could not be read, parsed or optimized.
    #[error("failed to load model from {}: {message}", path.display())]
    ModelLoad { path: PathBuf, message: String },

    /// The model ran but failed.
    #[error("model inference failed: {message}")]
    Inference { message: String },

    /// The model produced something that is not a probability vector.
    #[error("invalid model output: {message}")]
    InvalidOutput { message: String },

    /// The remote service did not answer in time.
    #[error("classification request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    /// Transport-level failure talking to the remote service.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("classification service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The remote body is not the expected JSON object.
    #[error("malformed classification response: {message}")]
    MalformedResponse { message: String },

    /// A label outside the fixed set.
    #[error("unknown label '{0}'")]
    UnknownLabel(String),

    /// The backend was handed the wrong kind of input.
    #[error("backend expects {expected} input")]
    UnexpectedInput { expected: &'static str },

    /// The backend cannot be built from the given configuration.
    #[error("invalid classifier configuration: {message}")]
    Config { message: String },

    /// Preparing the image for the backend failed.
    #[error(transparent)]
    Media(#[from] lungscan_media::Error),
}

impl Error {
    #[must_use]
    pub fn model_load(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn inference(message: impl std::fmt::Display) -> Self {
        Self::Inference {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_output(message: impl std::fmt::Display) -> Self {
        Self::InvalidOutput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn malformed_response(message: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn config(message: impl std::fmt::Display) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }
}
