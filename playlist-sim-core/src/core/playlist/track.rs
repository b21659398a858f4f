use crate::core::song::Song;

use derive_more::Display;
use std::sync::Arc;

/// The unique identifier of a track within a [TrackChain].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("track#{_0}")]
pub struct TrackId(usize);

/// A single node of the playlist chain, wrapping a song together with its neighbours.
#[derive(Debug)]
pub struct Track {
    song: Arc<dyn Song>,
    prev: Option<TrackId>,
    next: Option<TrackId>,
}

impl Track {
    /// Get the song of this track.
    pub fn song(&self) -> &Arc<dyn Song> {
        &self.song
    }

    /// Get the previous track within the chain, if any.
    pub fn prev(&self) -> Option<TrackId> {
        self.prev
    }

    /// Get the next track within the chain, if any.
    pub fn next(&self) -> Option<TrackId> {
        self.next
    }
}

/// The ordered, append-only chain of tracks of a playlist.
///
/// Tracks are stored in an arena and link to each other through their [TrackId],
/// which allows traversal in both directions without shared ownership cycles.
/// Once added, a track keeps the same id for the lifetime of the chain.
#[derive(Debug, Default)]
pub struct TrackChain {
    tracks: Vec<Track>,
    first: Option<TrackId>,
    last: Option<TrackId>,
}

impl TrackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the given song at the end of the chain.
    ///
    /// # Returns
    ///
    /// It returns the id of the newly created track.
    pub fn push(&mut self, song: Arc<dyn Song>) -> TrackId {
        let id = TrackId(self.tracks.len());
        self.tracks.push(Track {
            song,
            prev: self.last,
            next: None,
        });

        match self.last {
            Some(last) => self.tracks[last.0].next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        id
    }

    /// Get the track for the given id.
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.0)
    }

    /// Get the song for the given track id.
    pub fn song(&self, id: TrackId) -> Option<&Arc<dyn Song>> {
        self.get(id).map(|e| e.song())
    }

    pub fn first(&self) -> Option<TrackId> {
        self.first
    }

    pub fn last(&self) -> Option<TrackId> {
        self.last
    }

    /// Get the id of the track following the given track.
    pub fn next_of(&self, id: TrackId) -> Option<TrackId> {
        self.get(id).and_then(|e| e.next())
    }

    /// Get the id of the track preceding the given track.
    pub fn prev_of(&self, id: TrackId) -> Option<TrackId> {
        self.get(id).and_then(|e| e.prev())
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Iterate over the songs of the chain, from the first to the last track.
    pub fn iter(&self) -> TrackIter<'_> {
        TrackIter {
            chain: self,
            cursor: self.first,
        }
    }
}

/// Iterator walking a [TrackChain] from the first to the last track.
#[derive(Debug)]
pub struct TrackIter<'a> {
    chain: &'a TrackChain,
    cursor: Option<TrackId>,
}

impl<'a> Iterator for TrackIter<'a> {
    type Item = (TrackId, &'a Arc<dyn Song>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let track = self.chain.get(id)?;
        self.cursor = track.next();
        Some((id, track.song()))
    }
}
