//! Error handling - Flat, categorized errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Card rent error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing collaborator, bad config file)
    #[error("Config: {0}")]
    Config(String),

    /// Caller is not the party the operation requires
    #[error("Unauthorized: {0}")]
    Authorization(String),

    /// Operation attempted from the wrong lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Insufficient balance or allowance at the ledger
    #[error("Funds: {0}")]
    Funds(String),

    /// Unknown order or card
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input (zero price, zero term, overflow)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Error category, for callers that branch on the kind of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Authorization,
    State,
    Funds,
    NotFound,
    InvalidArgument,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::Authorization(_) => ErrorKind::Authorization,
            Error::InvalidState(_) => ErrorKind::State,
            Error::Funds(_) => ErrorKind::Funds,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(format!("Failed to parse config: {}", e))
    }
}
