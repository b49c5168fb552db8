use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across channel traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The message carries nothing that could be an image.
    #[error("message does not contain an image")]
    NotAnImage,

    /// Downloading an attachment failed.
    #[error("failed to fetch file {file_id}: {source}")]
    FetchFailed {
        file_id: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Delivering a reply failed.
    #[error("failed to send reply to chat {chat_id}: {source}")]
    SendFailed {
        chat_id: i64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn fetch_failed(
        file_id: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::FetchFailed {
            file_id: file_id.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn send_failed(chat_id: i64, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::SendFailed {
            chat_id,
            source: Box::new(source),
        }
    }
}
