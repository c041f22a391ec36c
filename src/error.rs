use thiserror::Error;

/// Statuses worth another attempt: timeouts, rate limiting and gateway errors.
const RETRY_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504, 522, 524];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} is outside the allowed domain")]
    Offsite { url: String },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            FetchError::Status { status, .. } => RETRY_STATUSES.contains(status),
            FetchError::Offsite { .. } => false,
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
