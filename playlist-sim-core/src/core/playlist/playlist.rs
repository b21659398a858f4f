use crate::core::song::Song;

use async_trait::async_trait;
use derive_more::Display;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// The playback state of a playlist.
#[derive(Debug, Default, Display, Copy, Clone, PartialEq, Eq)]
pub enum PlaylistState {
    /// No track is selected and nothing is being played.
    #[default]
    #[display("idle")]
    Idle,
    /// The current track is being played back.
    #[display("playing")]
    Playing,
    /// The current track has been paused, its remaining duration is retained.
    #[display("paused")]
    Paused,
    /// The playlist is moving its cursor to the next track.
    #[display("switching next")]
    SwitchingNext,
    /// The playlist is moving its cursor to the previous track.
    #[display("switching previous")]
    SwitchingPrev,
}

/// A snapshot of the song of a track within the playlist.
#[derive(Debug, Display, Clone, PartialEq)]
#[display("{name} ({duration:?})")]
pub struct TrackInfo {
    pub name: String,
    pub duration: Duration,
}

impl TrackInfo {
    /// Create a new snapshot of the given song.
    pub fn from_song(song: &Arc<dyn Song>) -> Self {
        Self {
            name: song.name().to_string(),
            duration: song.duration(),
        }
    }
}

/// The events published by a playlist.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum PlaylistEvent {
    /// Invoked when a new song has been appended to the playlist.
    #[display("Song {} has been added", _0)]
    SongAdded(TrackInfo),
    /// Invoked when the state of the playlist has changed.
    #[display("Playlist state changed to {}", _0)]
    StateChanged(PlaylistState),
    /// Invoked when the current track of the playlist has changed.
    #[display("Current track changed to {:?}", _0)]
    CurrentChanged(Option<TrackInfo>),
}

/// The playlist capability, controlling the playback of an ordered list of songs.
///
/// None of the commands return an error, commands which are not applicable
/// in the current state are silently ignored.
#[async_trait]
pub trait Playlist: Debug + Send + Sync {
    /// Start or resume the playback of the current track.
    /// If no track is selected, the first track of the playlist will be played.
    async fn play(&self);

    /// Pause the playback of the current track, retaining its remaining duration.
    async fn pause(&self);

    /// Append the given song at the end of the playlist.
    async fn add_song(&self, song: Arc<dyn Song>);

    /// Move to the next track of the playlist and start playing it.
    /// The playlist becomes idle when the end of the playlist has been reached.
    async fn next(&self);

    /// Move to the previous track of the playlist and start playing it.
    /// The playlist becomes idle when the start of the playlist has been reached.
    async fn prev(&self);

    /// Get the current state of the playlist.
    async fn state(&self) -> PlaylistState;

    /// Get the currently selected track of the playlist, if any.
    async fn current(&self) -> Option<TrackInfo>;

    /// Get the remaining duration of the current track.
    ///
    /// The value is only updated when the playback is paused or the track changes,
    /// it's not a live counter of a playing track.
    async fn left(&self) -> Duration;

    /// Get the total number of tracks within the playlist.
    async fn track_count(&self) -> usize;

    /// Get a snapshot of all tracks within the playlist, in playback order.
    async fn tracks(&self) -> Vec<TrackInfo>;
}
