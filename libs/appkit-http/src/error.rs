use appkit::{ConfigError, HubError, UrlError};

#[derive(Debug, thiserror::Error)]
pub enum HttpHelperError {
    #[error(transparent)]
    Hub(#[from] HubError),

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read request body: {0}")]
    Body(String),

    #[error("failed to encode response body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] http::Error),
}
