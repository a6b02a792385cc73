//! Error types for CogniSphere

use thiserror::Error;

/// Main error type for the conversation system
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed request fields
    #[error("{0}")]
    InvalidRequest(String),

    /// Missing or invalid credentials/token
    #[error("{0}")]
    Unauthenticated(String),

    /// Token was valid once but its lifetime elapsed
    #[error("Token expired. Please login again.")]
    TokenExpired,

    /// Requested record does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The completion oracle errored or returned an unexpected shape
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Password hashing failed
    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// HTTP status the server layer should map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) => 400,
            Error::Unauthenticated(_) | Error::TokenExpired => 401,
            Error::NotFound(_) => 404,
            _ => 500,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
