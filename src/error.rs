use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid time period format: {0}")]
    InvalidPeriodFormat(String),

    #[error("unknown variable: {0} (expected one of t2m, tp, gh)")]
    UnknownVariable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}
