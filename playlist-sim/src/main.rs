use crate::args::PlaylistSimArgs;
use crate::config::{PlaylistConfig, SongConfig};

use clap::Parser;
use fx_callback::Callback;
use log::{debug, info, warn, LevelFilter};
use playlist_sim_core::core::playlist::{
    Playlist, PlaylistEvent, PlaylistState, SimulatedPlaylist,
};
use playlist_sim_logging::SimLogger;
use std::io;
use std::time::Instant;
use tokio::io::BufReader;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

mod args;
mod config;
mod console;

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = PlaylistSimArgs::parse();
    let _logger = initialize_logger(&args).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let cancellation_token = CancellationToken::new();
    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt signal, stopping the playlist");
            signal_token.cancel();
        }
    });

    start(args, cancellation_token).await
}

/// Start the playlist simulator with the given arguments.
/// This future keeps running until the playlist has been played, the console has been closed,
/// or the cancellation token has been cancelled.
async fn start(args: PlaylistSimArgs, cancellation_token: CancellationToken) -> io::Result<()> {
    let start = Instant::now();
    debug!(
        "Starting playlist simulator {} with {}",
        playlist_sim_core::VERSION,
        args
    );
    let songs = load_songs(&args).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let playlist = SimulatedPlaylist::builder()
        .tick_resolution(args.tick_resolution())
        .cancellation_token(cancellation_token.clone())
        .build();

    for song in songs {
        playlist.add_song(song.into_song()).await;
    }
    let time_taken = start.elapsed();
    info!(
        "Created playlist with {} songs in {}.{:03} seconds",
        playlist.track_count().await,
        time_taken.as_secs(),
        time_taken.subsec_millis()
    );

    if args.interactive {
        if !args.no_autoplay {
            playlist.play().await;
        }

        let reader = BufReader::new(tokio::io::stdin());
        return console::run(&playlist, reader, tokio::io::stdout(), cancellation_token).await;
    }

    if playlist.track_count().await == 0 {
        warn!("The playlist is empty, add songs through --song or --playlist");
        return Ok(());
    }
    if args.no_autoplay {
        info!("Autoplay has been disabled, nothing to play");
        return Ok(());
    }

    play_until_idle(&playlist, cancellation_token).await;
    Ok(())
}

/// Play the playlist until it returns to idle or the token is cancelled.
async fn play_until_idle(playlist: &SimulatedPlaylist, cancellation_token: CancellationToken) {
    let mut receiver = playlist.subscribe();
    playlist.play().await;

    loop {
        select! {
            _ = cancellation_token.cancelled() => break,
            event = receiver.recv() => match event {
                Ok(event) => {
                    if let PlaylistEvent::StateChanged(PlaylistState::Idle) = &*event {
                        info!("Playlist has been played");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Playlist event receiver skipped {} events", skipped);
                    if playlist.state().await == PlaylistState::Idle {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

/// Collect the songs of the playlist file, followed by the songs of the arguments.
fn load_songs(args: &PlaylistSimArgs) -> config::Result<Vec<SongConfig>> {
    let mut songs = match &args.playlist {
        Some(path) => PlaylistConfig::from_file(path)?.songs,
        None => vec![],
    };

    songs.extend(args.songs.iter().cloned());
    Ok(songs)
}

fn initialize_logger(args: &PlaylistSimArgs) -> playlist_sim_logging::Result<Option<SimLogger>> {
    if args.disable_logger {
        return Ok(None);
    }

    let mut builder = SimLogger::builder();
    builder
        .root_level(args.log_level)
        .logger("mio", LevelFilter::Info)
        .logger("fx_callback", LevelFilter::Info);
    if let Some(path) = args.log_config.as_ref() {
        builder.config_path(path);
    }
    if let Some(path) = args.log_file.as_ref() {
        builder.log_path(path);
    }

    builder.build().map(Some)
}
