use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Not allowed: {0}")]
    NotAllowed(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// HTTP-ish status for transport layers that surface these errors.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidParameter(_) | Self::NotAllowed(_) => 400,
            Self::FieldNotFound(_) | Self::CollectionNotFound(_) => 404,
            Self::NotImplemented(_) => 501,
            Self::Backend(_) | Self::Json(_) | Self::Http(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
