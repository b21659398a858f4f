use crate::core::playback::{
    PlaybackId, PlaybackNotifications, SimulatedPlayback, DEFAULT_TICK_RESOLUTION,
};
use crate::core::playlist::{
    Playlist, PlaylistEvent, PlaylistState, TrackChain, TrackId, TrackInfo,
};
use crate::core::song::Song;

use async_trait::async_trait;
use fx_callback::{Callback, MultiThreadedCallback, Subscription};
use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc::{Receiver, UnboundedReceiver};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// The builder of a [SimulatedPlaylist].
#[derive(Debug, Default)]
pub struct SimulatedPlaylistBuilder {
    tick_resolution: Option<Duration>,
    cancellation_token: Option<CancellationToken>,
}

impl SimulatedPlaylistBuilder {
    /// Set the resolution at which the playback engine counts down the current track.
    pub fn tick_resolution(mut self, tick_resolution: Duration) -> Self {
        self.tick_resolution = Some(tick_resolution);
        self
    }

    /// Set the parent cancellation token of the playlist.
    /// Cancelling it will terminate the playback engine and the auto-advance watcher.
    pub fn cancellation_token(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = Some(cancellation_token);
        self
    }

    pub fn build(self) -> SimulatedPlaylist {
        SimulatedPlaylist::start(
            self.tick_resolution.unwrap_or(DEFAULT_TICK_RESOLUTION),
            self.cancellation_token.unwrap_or_default(),
        )
    }
}

/// The playlist controller which plays its tracks through a [SimulatedPlayback] engine.
///
/// The playlist owns the track chain together with the cursor, remaining duration and state,
/// which are only modified within a single guarded section per command.
/// A background watcher automatically advances to the next track when the engine
/// reports that the current track has finished.
///
/// Dropping the playlist terminates both the engine and the watcher.
#[derive(Debug)]
pub struct SimulatedPlaylist {
    inner: Arc<InnerSimulatedPlaylist>,
}

impl SimulatedPlaylist {
    /// Create a new playlist with the default tick resolution.
    pub fn new(cancellation_token: CancellationToken) -> Self {
        Self::builder().cancellation_token(cancellation_token).build()
    }

    pub fn builder() -> SimulatedPlaylistBuilder {
        SimulatedPlaylistBuilder::default()
    }

    /// Get the tick resolution of the underlying playback engine.
    pub fn tick_resolution(&self) -> Duration {
        self.inner.playback.tick_resolution()
    }

    fn start(tick_resolution: Duration, parent_token: CancellationToken) -> Self {
        let cancellation_token = parent_token.child_token();
        let (playback, notifications) =
            SimulatedPlayback::start(tick_resolution, cancellation_token.child_token());
        let PlaybackNotifications {
            stopped_at,
            finished,
        } = notifications;
        let inner = Arc::new(InnerSimulatedPlaylist {
            data: Mutex::new(PlaylistData {
                tracks: TrackChain::new(),
                current: None,
                left: Duration::ZERO,
                state: PlaylistState::Idle,
                playback_id: 0,
                stopped_at,
            }),
            playback,
            callbacks: MultiThreadedCallback::new(),
            cancellation_token,
        });

        let inner_main = inner.clone();
        tokio::spawn(async move {
            inner_main.start(finished).await;
        });

        Self { inner }
    }
}

impl Callback<PlaylistEvent> for SimulatedPlaylist {
    fn subscribe(&self) -> Subscription<PlaylistEvent> {
        self.inner.callbacks.subscribe()
    }
}

#[async_trait]
impl Playlist for SimulatedPlaylist {
    async fn play(&self) {
        let mut data = self.inner.data.lock().await;
        self.inner.play_locked(&mut data).await;
    }

    async fn pause(&self) {
        let mut data = self.inner.data.lock().await;
        self.inner.pause_locked(&mut data).await;
    }

    async fn add_song(&self, song: Arc<dyn Song>) {
        let mut data = self.inner.data.lock().await;
        self.inner.add_song_locked(&mut data, song);
    }

    async fn next(&self) {
        let mut data = self.inner.data.lock().await;
        self.inner.next_locked(&mut data).await;
    }

    async fn prev(&self) {
        let mut data = self.inner.data.lock().await;
        self.inner.prev_locked(&mut data).await;
    }

    async fn state(&self) -> PlaylistState {
        self.inner.data.lock().await.state
    }

    async fn current(&self) -> Option<TrackInfo> {
        let data = self.inner.data.lock().await;
        data.current_info()
    }

    async fn left(&self) -> Duration {
        self.inner.data.lock().await.left
    }

    async fn track_count(&self) -> usize {
        self.inner.data.lock().await.tracks.len()
    }

    async fn tracks(&self) -> Vec<TrackInfo> {
        let data = self.inner.data.lock().await;
        data.tracks
            .iter()
            .map(|(_, song)| TrackInfo::from_song(song))
            .collect()
    }
}

impl Drop for SimulatedPlaylist {
    fn drop(&mut self) {
        trace!("Dropping {:?}", self);
        self.inner.cancellation_token.cancel();
    }
}

/// The guarded data of the playlist.
#[derive(Debug)]
struct PlaylistData {
    tracks: TrackChain,
    current: Option<TrackId>,
    /// The remaining duration of the current track, as last known by the controller.
    left: Duration,
    state: PlaylistState,
    /// The id of the last countdown which has been started on the engine.
    playback_id: PlaybackId,
    stopped_at: Receiver<Duration>,
}

impl PlaylistData {
    fn current_info(&self) -> Option<TrackInfo> {
        self.current
            .and_then(|id| self.tracks.song(id))
            .map(TrackInfo::from_song)
    }

    fn current_duration(&self) -> Duration {
        self.current
            .and_then(|id| self.tracks.song(id))
            .map(|e| e.duration())
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug)]
struct InnerSimulatedPlaylist {
    data: Mutex<PlaylistData>,
    playback: SimulatedPlayback,
    callbacks: MultiThreadedCallback<PlaylistEvent>,
    cancellation_token: CancellationToken,
}

impl InnerSimulatedPlaylist {
    /// Start the auto-advance watcher of the playlist.
    async fn start(&self, mut finished: UnboundedReceiver<PlaybackId>) {
        loop {
            select! {
                _ = self.cancellation_token.cancelled() => break,
                id = finished.recv() => match id {
                    Some(id) => self.handle_finished(id).await,
                    None => break,
                },
            }
        }

        debug!("Simulated playlist main loop ended");
    }

    async fn handle_finished(&self, id: PlaybackId) {
        let mut data = self.data.lock().await;

        if data.state != PlaylistState::Playing || data.playback_id != id {
            trace!(
                "Ignoring finished playback {}, playlist is {} with playback {}",
                id,
                data.state,
                data.playback_id
            );
            return;
        }

        let next = data.current.and_then(|e| data.tracks.next_of(e));
        match next {
            Some(next) => {
                debug!("Playback {} finished, advancing to {}", id, next);
                self.update_state(&mut data, PlaylistState::SwitchingNext);
                self.move_cursor(&mut data, Some(next));
                self.play_locked(&mut data).await;
            }
            None => {
                info!("Reached the end of the playlist");
                self.move_cursor(&mut data, None);
                self.update_state(&mut data, PlaylistState::Idle);
            }
        }
    }

    fn add_song_locked(&self, data: &mut PlaylistData, song: Arc<dyn Song>) {
        let info = TrackInfo::from_song(&song);
        let id = data.tracks.push(song);
        debug!("Added song {} as {}", info, id);

        if data.tracks.len() == 1 {
            self.move_cursor(data, Some(id));
        }

        self.callbacks.invoke(PlaylistEvent::SongAdded(info));
    }

    async fn play_locked(&self, data: &mut PlaylistData) {
        if data.state == PlaylistState::Playing {
            trace!("Playlist is already playing");
            return;
        }

        if data.current.is_none() {
            match data.tracks.first() {
                Some(first) => self.move_cursor(data, Some(first)),
                None => {
                    debug!("Unable to start playback, playlist is empty");
                    return;
                }
            }
        }

        data.playback_id += 1;
        if let Err(e) = self.playback.set_duration(data.playback_id, data.left) {
            warn!("Failed to start the playback, {}", e);
            return;
        }

        if let Some(info) = data.current_info() {
            info!("Playing {} with {:?} remaining", info.name, data.left);
        }
        self.update_state(data, PlaylistState::Playing);
    }

    async fn pause_locked(&self, data: &mut PlaylistData) {
        if data.state != PlaylistState::Playing {
            trace!("Playlist is not playing, ignoring pause");
            return;
        }

        if self.interrupt_locked(data).await {
            if let Some(info) = data.current_info() {
                info!("Paused {} with {:?} remaining", info.name, data.left);
            }
            self.update_state(data, PlaylistState::Paused);
        }
    }

    /// Interrupt the active countdown and store the remaining duration reported by the engine.
    /// The state of the playlist is left untouched.
    ///
    /// # Returns
    ///
    /// It returns `true` when the engine reported the remaining duration.
    async fn interrupt_locked(&self, data: &mut PlaylistData) -> bool {
        // discard any remaining duration of an abandoned interrupt
        while data.stopped_at.try_recv().is_ok() {}

        if let Err(e) = self.playback.interrupt() {
            warn!("Failed to interrupt the playback, {}", e);
            return false;
        }

        let remaining = select! {
            _ = self.cancellation_token.cancelled() => None,
            remaining = data.stopped_at.recv() => remaining,
        };

        match remaining {
            Some(remaining) => {
                data.left = remaining.min(data.current_duration());
                true
            }
            None => {
                warn!("Playback engine closed before reporting the remaining duration");
                false
            }
        }
    }

    async fn next_locked(&self, data: &mut PlaylistData) {
        let Some(current) = data.current else {
            trace!("No current track, next behaves as play");
            self.play_locked(data).await;
            return;
        };

        match data.tracks.next_of(current) {
            Some(next) => {
                self.pause_locked(data).await;
                self.update_state(data, PlaylistState::SwitchingNext);
                self.move_cursor(data, Some(next));
                self.play_locked(data).await;
            }
            None => {
                debug!("No track after {}, clearing the playlist cursor", current);
                self.clear_locked(data).await;
            }
        }
    }

    async fn prev_locked(&self, data: &mut PlaylistData) {
        let Some(current) = data.current else {
            trace!("No current track, prev starts from the last track");
            if let Some(last) = data.tracks.last() {
                self.move_cursor(data, Some(last));
            }
            self.play_locked(data).await;
            return;
        };

        match data.tracks.prev_of(current) {
            Some(prev) => {
                self.pause_locked(data).await;
                self.update_state(data, PlaylistState::SwitchingPrev);
                self.move_cursor(data, Some(prev));
                self.play_locked(data).await;
            }
            None => {
                debug!("No track before {}, clearing the playlist cursor", current);
                self.clear_locked(data).await;
            }
        }
    }

    /// Stop any active countdown and reset the playlist to idle without a current track.
    async fn clear_locked(&self, data: &mut PlaylistData) {
        if data.state == PlaylistState::Playing {
            self.interrupt_locked(data).await;
        }
        self.move_cursor(data, None);
        self.update_state(data, PlaylistState::Idle);
    }

    /// Move the cursor to the given track, resetting the remaining duration to its full duration.
    fn move_cursor(&self, data: &mut PlaylistData, id: Option<TrackId>) {
        let changed = data.current != id;
        data.current = id;
        data.left = data.current_duration();

        if changed {
            let info = data.current_info();
            debug!("Playlist cursor moved to {:?}", info);
            self.callbacks.invoke(PlaylistEvent::CurrentChanged(info));
        }
    }

    fn update_state(&self, data: &mut PlaylistData, state: PlaylistState) {
        if data.state == state {
            return;
        }

        debug!("Updating playlist state from {} to {}", data.state, state);
        data.state = state;
        self.callbacks.invoke(PlaylistEvent::StateChanged(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::song::BasicSong;
    use crate::{
        assert_duration_near, assert_timeout, assert_timeout_eq, init_logger, recv_timeout,
    };
    use tokio::sync::mpsc::unbounded_channel;
    use tokio::time;

    const TOLERANCE: Duration = Duration::from_millis(30);

    fn song(name: &str, millis: u64) -> Arc<dyn Song> {
        Arc::new(BasicSong::new(name, Duration::from_millis(millis)))
    }

    fn track(name: &str, millis: u64) -> Option<TrackInfo> {
        Some(TrackInfo {
            name: name.to_string(),
            duration: Duration::from_millis(millis),
        })
    }

    async fn new_playlist(songs: Vec<Arc<dyn Song>>) -> SimulatedPlaylist {
        let playlist = SimulatedPlaylist::builder()
            .tick_resolution(DEFAULT_TICK_RESOLUTION)
            .cancellation_token(CancellationToken::new())
            .build();
        for song in songs {
            playlist.add_song(song).await;
        }
        playlist
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_song_empty_playlist() {
        init_logger!();
        let playlist = new_playlist(vec![]).await;

        playlist.add_song(song("A", 100)).await;

        assert_eq!(track("A", 100), playlist.current().await);
        assert_eq!(Duration::from_millis(100), playlist.left().await);
        assert_eq!(PlaylistState::Idle, playlist.state().await);
        assert_eq!(1, playlist.track_count().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_song_keeps_cursor() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 100)]).await;

        playlist.add_song(song("B", 200)).await;
        playlist.add_song(song("C", 300)).await;

        assert_eq!(track("A", 100), playlist.current().await);
        assert_eq!(3, playlist.track_count().await);
        let tracks = playlist.tracks().await;
        assert_eq!(
            track("C", 300),
            tracks.last().cloned(),
            "expected the last track to be the most recently added song"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_song_while_playing() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 100), song("B", 100)]).await;

        playlist.play().await;
        playlist.add_song(song("D", 100)).await;

        assert_eq!(PlaylistState::Playing, playlist.state().await);
        assert_eq!(track("A", 100), playlist.current().await);
        assert_eq!(3, playlist.track_count().await);
        assert_eq!(track("D", 100), playlist.tracks().await.last().cloned());
        assert_timeout!(
            Duration::from_millis(100) + TOLERANCE,
            playlist.current().await == track("B", 100),
            "expected the playlist to advance to the next track"
        );
        assert_eq!(PlaylistState::Playing, playlist.state().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_song_during_auto_advance() {
        init_logger!();
        let playlist = Arc::new(new_playlist(vec![song("A", 30), song("B", 30)]).await);

        playlist.play().await;
        let handle = {
            let playlist = playlist.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(30)).await;
                playlist.add_song(song("C", 30)).await;
            })
        };
        handle.await.unwrap();

        assert_eq!(3, playlist.track_count().await);
        assert_eq!(track("C", 30), playlist.tracks().await.last().cloned());
        assert_timeout!(
            Duration::from_millis(60) + TOLERANCE,
            playlist.current().await == track("C", 30),
            "expected the appended track to be played"
        );
        assert_timeout_eq!(
            Duration::from_millis(30) + TOLERANCE,
            PlaylistState::Idle,
            playlist.state().await
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_builder_tick_resolution() {
        init_logger!();
        let playlist = SimulatedPlaylist::builder()
            .tick_resolution(Duration::from_millis(25))
            .build();
        assert_eq!(Duration::from_millis(25), playlist.tick_resolution());

        let playlist = SimulatedPlaylist::builder()
            .tick_resolution(Duration::ZERO)
            .build();
        assert_eq!(
            Duration::from_millis(1),
            playlist.tick_resolution(),
            "expected the tick resolution to be clamped"
        );

        let playlist = SimulatedPlaylist::new(CancellationToken::new());
        assert_eq!(DEFAULT_TICK_RESOLUTION, playlist.tick_resolution());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_play_empty_playlist() {
        init_logger!();
        let playlist = new_playlist(vec![]).await;

        playlist.play().await;

        assert_eq!(PlaylistState::Idle, playlist.state().await);
        assert_eq!(None, playlist.current().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_play_twice() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 500), song("B", 500)]).await;

        playlist.play().await;
        let state = playlist.state().await;
        let current = playlist.current().await;
        playlist.play().await;

        assert_eq!(state, playlist.state().await);
        assert_eq!(current, playlist.current().await);
        assert_eq!(PlaylistState::Playing, playlist.state().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_next_until_end() {
        init_logger!();
        let playlist =
            new_playlist(vec![song("A", 100), song("B", 100), song("C", 100)]).await;

        playlist.play().await;
        assert_eq!(track("A", 100), playlist.current().await);
        assert_eq!(PlaylistState::Playing, playlist.state().await);

        playlist.next().await;
        assert_eq!(track("B", 100), playlist.current().await);
        assert_eq!(PlaylistState::Playing, playlist.state().await);

        playlist.next().await;
        assert_eq!(track("C", 100), playlist.current().await);
        assert_eq!(PlaylistState::Playing, playlist.state().await);

        playlist.next().await;
        assert_eq!(None, playlist.current().await);
        assert_eq!(PlaylistState::Idle, playlist.state().await);
        assert_eq!(Duration::ZERO, playlist.left().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_single_track_finishes() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 100)]).await;

        playlist.play().await;
        time::sleep(Duration::from_millis(150)).await;

        assert_eq!(PlaylistState::Idle, playlist.state().await);
        assert_eq!(None, playlist.current().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_auto_advance() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 60), song("B", 60)]).await;

        playlist.play().await;

        assert_timeout!(
            Duration::from_millis(60) + TOLERANCE,
            playlist.current().await == track("B", 60),
            "expected the playlist to advance to the next track"
        );
        assert_eq!(PlaylistState::Playing, playlist.state().await);
        assert_timeout_eq!(
            Duration::from_millis(60) + TOLERANCE,
            PlaylistState::Idle,
            playlist.state().await
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pause_resume() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 1000)]).await;

        playlist.play().await;
        time::sleep(Duration::from_millis(70)).await;
        playlist.pause().await;

        assert_eq!(PlaylistState::Paused, playlist.state().await);
        assert_duration_near!(
            Duration::from_millis(930),
            playlist.left().await,
            DEFAULT_TICK_RESOLUTION * 2
        );

        playlist.play().await;
        time::sleep(Duration::from_millis(20)).await;
        playlist.pause().await;

        assert_duration_near!(
            Duration::from_millis(910),
            playlist.left().await,
            DEFAULT_TICK_RESOLUTION * 3
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_resume_plays_remaining_duration() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 200)]).await;

        playlist.play().await;
        time::sleep(Duration::from_millis(120)).await;
        playlist.pause().await;
        let left = playlist.left().await;
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(PlaylistState::Paused, playlist.state().await);

        let started_at = std::time::Instant::now();
        playlist.play().await;
        assert_timeout!(
            Duration::from_millis(200),
            playlist.state().await == PlaylistState::Idle,
            "expected the resumed track to finish"
        );

        assert_duration_near!(left, started_at.elapsed(), TOLERANCE);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pause_not_playing() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 100)]).await;

        playlist.pause().await;

        assert_eq!(PlaylistState::Idle, playlist.state().await);
        assert_eq!(Duration::from_millis(100), playlist.left().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_next_empty_playlist() {
        init_logger!();
        let playlist = new_playlist(vec![]).await;

        playlist.next().await;

        assert_eq!(PlaylistState::Idle, playlist.state().await);
        assert_eq!(None, playlist.current().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_next_without_cursor_plays_first_track() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 500), song("B", 500)]).await;

        playlist.next().await;
        playlist.next().await;
        assert_eq!(None, playlist.current().await);
        assert_eq!(PlaylistState::Idle, playlist.state().await);

        playlist.next().await;

        assert_eq!(track("A", 500), playlist.current().await);
        assert_eq!(PlaylistState::Playing, playlist.state().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prev() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 500), song("B", 500)]).await;

        playlist.play().await;
        playlist.next().await;
        time::sleep(Duration::from_millis(50)).await;
        playlist.prev().await;

        assert_eq!(track("A", 500), playlist.current().await);
        assert_eq!(PlaylistState::Playing, playlist.state().await);
        assert_eq!(
            Duration::from_millis(500),
            playlist.left().await,
            "expected the remaining duration to be reset to the full track duration"
        );

        playlist.prev().await;

        assert_eq!(None, playlist.current().await);
        assert_eq!(PlaylistState::Idle, playlist.state().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prev_without_cursor_plays_last_track() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 500), song("B", 500)]).await;
        playlist.prev().await;
        assert_eq!(None, playlist.current().await);

        playlist.prev().await;

        assert_eq!(track("B", 500), playlist.current().await);
        assert_eq!(PlaylistState::Playing, playlist.state().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_next_from_paused() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 500), song("B", 300)]).await;

        playlist.play().await;
        time::sleep(Duration::from_millis(30)).await;
        playlist.pause().await;
        playlist.next().await;

        assert_eq!(track("B", 300), playlist.current().await);
        assert_eq!(PlaylistState::Playing, playlist.state().await);
        assert_eq!(Duration::from_millis(300), playlist.left().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clearing_cursor_stops_countdown() {
        init_logger!();
        let playlist = new_playlist(vec![song("A", 80)]).await;
        let mut receiver = playlist.subscribe();
        let (tx, mut rx) = unbounded_channel();
        tokio::spawn(async move {
            while let Ok(event) = receiver.recv().await {
                if let PlaylistEvent::StateChanged(state) = &*event {
                    let _ = tx.send(*state);
                }
            }
        });

        playlist.play().await;
        playlist.next().await;
        time::sleep(Duration::from_millis(150)).await;

        assert_eq!(PlaylistState::Playing, recv_timeout!(&mut rx, TOLERANCE));
        assert_eq!(
            PlaylistState::Idle,
            recv_timeout!(&mut rx, TOLERANCE),
            "expected the playlist to go straight from playing to idle"
        );
        assert!(
            rx.try_recv().is_err(),
            "expected no further state changes after the cursor was cleared"
        );
        assert_eq!(Duration::ZERO, playlist.left().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_events() {
        init_logger!();
        let playlist = new_playlist(vec![]).await;
        let mut receiver = playlist.subscribe();
        let (tx, mut rx) = unbounded_channel();
        tokio::spawn(async move {
            while let Ok(event) = receiver.recv().await {
                let _ = tx.send((*event).clone());
            }
        });

        playlist.add_song(song("A", 500)).await;
        playlist.play().await;

        let result = recv_timeout!(&mut rx, TOLERANCE);
        assert_eq!(PlaylistEvent::CurrentChanged(track("A", 500)), result);
        let result = recv_timeout!(&mut rx, TOLERANCE);
        assert_eq!(
            PlaylistEvent::SongAdded(TrackInfo {
                name: "A".to_string(),
                duration: Duration::from_millis(500),
            }),
            result
        );
        let result = recv_timeout!(&mut rx, TOLERANCE);
        assert_eq!(PlaylistEvent::StateChanged(PlaylistState::Playing), result);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_command_sequence() {
        init_logger!();
        let playlist =
            new_playlist(vec![song("A", 400), song("B", 400), song("C", 400)]).await;

        playlist.play().await;
        time::sleep(Duration::from_millis(20)).await;
        playlist.pause().await;
        assert_eq!(PlaylistState::Paused, playlist.state().await);
        assert_eq!(track("A", 400), playlist.current().await);

        playlist.next().await;
        assert_eq!(track("B", 400), playlist.current().await);
        playlist.next().await;
        assert_eq!(track("C", 400), playlist.current().await);
        playlist.prev().await;
        assert_eq!(track("B", 400), playlist.current().await);
        playlist.pause().await;
        playlist.pause().await;
        assert_eq!(PlaylistState::Paused, playlist.state().await);

        playlist.play().await;
        assert_eq!(PlaylistState::Playing, playlist.state().await);
        assert_eq!(track("B", 400), playlist.current().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_add_song() {
        init_logger!();
        let playlist = Arc::new(new_playlist(vec![]).await);

        let handles: Vec<_> = (0..2)
            .map(|caller| {
                let playlist = playlist.clone();
                tokio::spawn(async move {
                    for i in 0..10_000 {
                        playlist
                            .add_song(song(format!("{}-{}", caller, i).as_str(), 100))
                            .await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(20_000, playlist.track_count().await);
        assert_eq!(20_000, playlist.tracks().await.len());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_commands() {
        init_logger!();
        let playlist = Arc::new(
            new_playlist(vec![
                song("A", 20),
                song("B", 30),
                song("C", 10),
                song("D", 40),
            ])
            .await,
        );

        let handles: Vec<_> = (0..4)
            .map(|caller| {
                let playlist = playlist.clone();
                tokio::spawn(async move {
                    for i in 0..50 {
                        match (caller + i) % 4 {
                            0 => playlist.play().await,
                            1 => playlist.next().await,
                            2 => playlist.pause().await,
                            _ => playlist.prev().await,
                        }
                        time::sleep(Duration::from_millis(1)).await;
                    }
                })
            })
            .collect();

        let result = time::timeout(Duration::from_secs(10), async {
            for handle in handles {
                handle.await.unwrap();
            }
        })
        .await;
        assert!(result.is_ok(), "expected all commands to complete");

        let state = playlist.state().await;
        let current = playlist.current().await;
        match state {
            PlaylistState::Idle => assert_eq!(None, current),
            PlaylistState::Playing | PlaylistState::Paused => assert!(current.is_some()),
            _ => assert!(false, "expected no intermediate state, got {}", state),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drop() {
        init_logger!();
        let token = CancellationToken::new();
        let playlist = SimulatedPlaylist::new(token.clone());
        let inner = playlist.inner.clone();

        drop(playlist);

        assert!(
            inner.cancellation_token.is_cancelled(),
            "expected the playlist to have been cancelled"
        );
        assert!(
            !token.is_cancelled(),
            "expected the parent token to not have been cancelled"
        );
        assert_timeout!(
            Duration::from_millis(200),
            !inner.playback.is_running(),
            "expected the playback engine to have been stopped"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parent_cancellation() {
        init_logger!();
        let token = CancellationToken::new();
        let playlist = SimulatedPlaylist::new(token.clone());
        playlist.add_song(song("A", 500)).await;

        token.cancel();
        playlist.play().await;

        assert_eq!(PlaylistState::Idle, playlist.state().await);
    }
}
