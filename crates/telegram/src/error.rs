use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Download(#[from] teloxide::DownloadError),

    #[error(transparent)]
    Channel(#[from] lungscan_channels::Error),

    /// The long-poll HTTP client could not be constructed.
    #[error("failed to build telegram http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Another process is already polling updates for this token.
    #[error("another bot instance is already running with this token")]
    PollingConflict,
}

pub type Result<T> = std::result::Result<T, Error>;
