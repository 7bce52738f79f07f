use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The backend answered, but with an error payload.
    #[error("backend error: {0}")]
    Remote(String),

    /// The request never produced a usable answer (transport failure,
    /// timeout or an undecodable body).
    #[error("backend unreachable: {0}")]
    Connectivity(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}
