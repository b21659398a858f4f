use std::{io, result};
use thiserror::Error;

/// The result type of the logger bootstrap.
pub type Result<T> = result::Result<T, Error>;

/// The errors which can occur while initializing the logger.
#[derive(Debug, Error)]
pub enum Error {
    #[error("the logger has already been initialized")]
    AlreadyInitialized,
    #[error("logger config {0} does not exist")]
    NotFound(String),
    #[error("logger config is invalid, {0}")]
    InvalidConfig(String),
    #[error("failed to prepare the log file, {0}")]
    Io(#[from] io::Error),
}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        match (self, other) {
            (Error::AlreadyInitialized, Error::AlreadyInitialized) => true,
            (Error::NotFound(a), Error::NotFound(b)) => a == b,
            (Error::InvalidConfig(_), Error::InvalidConfig(_)) => true,
            (Error::Io(a), Error::Io(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}
