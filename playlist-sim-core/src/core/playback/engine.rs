use crate::core::playback::{Error, Result};

use derive_more::Display;
use log::{debug, trace, warn};
use std::future;
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc::{
    channel, unbounded_channel, Receiver, Sender, UnboundedReceiver, UnboundedSender,
};
use tokio::time::{interval_at, Instant, Interval};
use tokio_util::sync::CancellationToken;

/// The default resolution at which the remaining playback time is decremented.
pub const DEFAULT_TICK_RESOLUTION: Duration = Duration::from_millis(10);
/// The smallest tick resolution the engine accepts.
const MIN_TICK_RESOLUTION: Duration = Duration::from_millis(1);

/// The identifier of a single countdown, started by [PlaybackCommand::SetDuration].
/// It's echoed back on the `finished` notification when the countdown reaches zero.
pub type PlaybackId = u64;

/// The control commands accepted by the playback engine.
#[derive(Debug, Display, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    /// (Re)start the countdown with the given remaining duration.
    #[display("set duration {_1:?} for playback {_0}")]
    SetDuration(PlaybackId, Duration),
    /// Stop the countdown and report the remaining duration.
    #[display("interrupt")]
    Interrupt,
}

/// The notification streams of a started playback engine.
#[derive(Debug)]
pub struct PlaybackNotifications {
    /// Receives the remaining duration of the countdown after each [PlaybackCommand::Interrupt].
    pub stopped_at: Receiver<Duration>,
    /// Receives the [PlaybackId] of each countdown that reached zero.
    pub finished: UnboundedReceiver<PlaybackId>,
}

/// The simulated playback engine, which counts down the remaining duration of the current track
/// without playing any actual audio.
///
/// The engine runs a single background worker which handles one command or tick at a time.
/// The worker keeps running until the engine is stopped or dropped.
///
/// # Examples
///
/// ```no_run
/// use playlist_sim_core::core::playback::{SimulatedPlayback, DEFAULT_TICK_RESOLUTION};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// async fn example() {
///     let (playback, mut notifications) =
///         SimulatedPlayback::start(DEFAULT_TICK_RESOLUTION, CancellationToken::new());
///
///     playback.set_duration(1, Duration::from_millis(100)).unwrap();
///     let finished = notifications.finished.recv().await;
///     assert_eq!(Some(1), finished);
/// }
/// ```
#[derive(Debug)]
pub struct SimulatedPlayback {
    command_sender: UnboundedSender<PlaybackCommand>,
    tick_resolution: Duration,
    cancellation_token: CancellationToken,
}

impl SimulatedPlayback {
    /// Start a new playback engine worker.
    ///
    /// # Arguments
    ///
    /// * `tick_resolution` - The interval at which the remaining duration is decremented.
    /// * `cancellation_token` - The token which terminates the worker when cancelled.
    ///
    /// # Returns
    ///
    /// It returns the control handle of the engine and its notification streams.
    pub fn start(
        tick_resolution: Duration,
        cancellation_token: CancellationToken,
    ) -> (Self, PlaybackNotifications) {
        let tick_resolution = tick_resolution.max(MIN_TICK_RESOLUTION);
        let (command_sender, command_receiver) = unbounded_channel();
        let (stopped_at_sender, stopped_at) = channel(1);
        let (finished_sender, finished) = unbounded_channel();
        let worker = PlaybackWorker {
            tick_resolution,
            remaining: Duration::ZERO,
            playback: None,
            ticker: None,
            stopped_at_sender,
            finished_sender,
            cancellation_token: cancellation_token.clone(),
        };

        tokio::spawn(async move {
            worker.start(command_receiver).await;
        });

        (
            Self {
                command_sender,
                tick_resolution,
                cancellation_token,
            },
            PlaybackNotifications {
                stopped_at,
                finished,
            },
        )
    }

    /// Get the resolution at which the engine decrements the remaining duration.
    pub fn tick_resolution(&self) -> Duration {
        self.tick_resolution
    }

    /// Start counting down from the given duration.
    /// This replaces any countdown which might still be active.
    pub fn set_duration(&self, id: PlaybackId, duration: Duration) -> Result<()> {
        self.send(PlaybackCommand::SetDuration(id, duration))
    }

    /// Interrupt the active countdown.
    /// The remaining duration is reported on the `stopped_at` notification stream.
    pub fn interrupt(&self) -> Result<()> {
        self.send(PlaybackCommand::Interrupt)
    }

    /// Check if the engine worker still accepts commands.
    pub fn is_running(&self) -> bool {
        !self.cancellation_token.is_cancelled() && !self.command_sender.is_closed()
    }

    /// Stop the engine worker.
    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    fn send(&self, command: PlaybackCommand) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(Error::Closed);
        }

        self.command_sender.send(command).map_err(|_| Error::Closed)
    }
}

impl Drop for SimulatedPlayback {
    fn drop(&mut self) {
        trace!("Dropping {:?}", self);
        self.cancellation_token.cancel();
    }
}

enum WorkerEvent {
    Command(PlaybackCommand),
    Tick,
}

#[derive(Debug)]
struct PlaybackWorker {
    tick_resolution: Duration,
    remaining: Duration,
    playback: Option<PlaybackId>,
    ticker: Option<Interval>,
    stopped_at_sender: Sender<Duration>,
    finished_sender: UnboundedSender<PlaybackId>,
    cancellation_token: CancellationToken,
}

impl PlaybackWorker {
    /// Start the main loop of the playback engine.
    /// Exactly one command or tick is handled per iteration.
    async fn start(mut self, mut command_receiver: UnboundedReceiver<PlaybackCommand>) {
        loop {
            let event = select! {
                _ = self.cancellation_token.cancelled() => break,
                command = command_receiver.recv() => match command {
                    Some(command) => WorkerEvent::Command(command),
                    None => break,
                },
                _ = Self::next_tick(&mut self.ticker) => WorkerEvent::Tick,
            };

            match event {
                WorkerEvent::Command(command) => self.handle_command(command).await,
                WorkerEvent::Tick => self.handle_tick(),
            }
        }

        debug!("Playback engine main loop ended");
    }

    /// Wait for the next tick of the active countdown.
    /// It never resolves when no countdown is active.
    async fn next_tick(ticker: &mut Option<Interval>) {
        match ticker {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }

    async fn handle_command(&mut self, command: PlaybackCommand) {
        trace!("Playback engine is handling command {}", command);
        match command {
            PlaybackCommand::SetDuration(id, duration) => {
                debug!("Starting countdown of {:?} for playback {}", duration, id);
                self.remaining = duration;
                self.playback = Some(id);
                self.ticker = Some(interval_at(
                    Instant::now() + self.tick_resolution,
                    self.tick_resolution,
                ));
            }
            PlaybackCommand::Interrupt => {
                self.ticker = None;
                debug!(
                    "Playback {:?} interrupted with {:?} remaining",
                    self.playback, self.remaining
                );
                self.notify_stopped_at(self.remaining).await;
            }
        }
    }

    fn handle_tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(self.tick_resolution);
        trace!("Playback tick, {:?} remaining", self.remaining);

        if self.remaining.is_zero() {
            self.ticker = None;
            if let Some(id) = self.playback.take() {
                debug!("Playback {} has finished", id);
                if self.finished_sender.send(id).is_err() {
                    warn!("Unable to notify playback {} finished, receiver has been closed", id);
                }
            }
        }
    }

    async fn notify_stopped_at(&self, remaining: Duration) {
        select! {
            _ = self.cancellation_token.cancelled() => {},
            result = self.stopped_at_sender.send(remaining) => {
                if result.is_err() {
                    warn!("Unable to notify playback stopped at {:?}, receiver has been closed", remaining);
                }
            }
        }
    }
}
