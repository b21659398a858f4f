use thiserror::Error;

/// The result type of playback operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors that can occur while controlling the playback engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("the playback engine has been closed")]
    Closed,
}
