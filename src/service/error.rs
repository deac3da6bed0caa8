use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("pageCode is required")]
    MissingPageCode,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("no data available for page {0}")]
    NoData(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type TrackingResult<T> = Result<T, TrackingError>;
