use derive_more::Display;
use std::fmt::Debug;
use std::time::Duration;

/// A song which can be added to a playlist.
///
/// Implementations are expected to be immutable, every invocation should return the same values
/// for the lifetime of the song.
pub trait Song: Debug + Send + Sync {
    /// Get the display name of the song.
    fn name(&self) -> &str;

    /// Get the total playback duration of the song.
    fn duration(&self) -> Duration;
}

/// The basic immutable [Song] implementation which only holds a name and duration.
#[derive(Debug, Display, Clone, PartialEq)]
#[display("{name} ({duration:?})")]
pub struct BasicSong {
    name: String,
    duration: Duration,
}

impl BasicSong {
    /// Create a new song with the given name and duration.
    pub fn new<S: Into<String>>(name: S, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

impl Song for BasicSong {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn duration(&self) -> Duration {
        self.duration
    }
}
