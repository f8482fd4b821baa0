use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by the recognition core. Callers can tell a
/// duplicate registration, a cancelled query and a backend failure apart
/// by matching on the variant.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dsp failure: {0}")]
    Dsp(String),

    #[error("duplicate song: {0}")]
    DuplicateKey(String),

    #[error("store failure: {0}")]
    Store(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn dsp(msg: impl Into<String>) -> Self {
        Error::Dsp(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<mongodb::bson::document::ValueAccessError> for Error {
    fn from(err: mongodb::bson::document::ValueAccessError) -> Self {
        Error::Store(format!("malformed fingerprint document: {}", err))
    }
}
