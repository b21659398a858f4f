use crate::config::SongConfig;

use derive_more::Display;
use log::{debug, trace, warn};
use playlist_sim_core::core::playlist::Playlist;
use std::io;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::sync::CancellationToken;

const HELP: &str = "commands: play | pause | next | prev | add NAME MILLIS | status | list | help | quit";

/// The errors of parsing a console command.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConsoleError {
    #[error("unknown command \"{0}\", type help for the available commands")]
    UnknownCommand(String),
    #[error("invalid arguments for {0}, {1}")]
    InvalidArguments(String, String),
}

/// A command read from the interactive console.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ConsoleCommand {
    #[display("play")]
    Play,
    #[display("pause")]
    Pause,
    #[display("next")]
    Next,
    #[display("prev")]
    Prev,
    #[display("add {}", _0)]
    Add(SongConfig),
    #[display("status")]
    Status,
    #[display("list")]
    List,
    #[display("help")]
    Help,
    #[display("quit")]
    Quit,
}

impl ConsoleCommand {
    /// Execute the command on the given playlist.
    ///
    /// # Returns
    ///
    /// It returns the text to show to the user, if any.
    pub async fn execute(self, playlist: &dyn Playlist) -> Option<String> {
        debug!("Executing console command {}", self);
        match self {
            ConsoleCommand::Play => playlist.play().await,
            ConsoleCommand::Pause => playlist.pause().await,
            ConsoleCommand::Next => playlist.next().await,
            ConsoleCommand::Prev => playlist.prev().await,
            ConsoleCommand::Add(song) => {
                let name = song.name.clone();
                playlist.add_song(song.into_song()).await;
                return Some(format!("added {}", name));
            }
            ConsoleCommand::Status => return Some(status(playlist).await),
            ConsoleCommand::List => return Some(list(playlist).await),
            ConsoleCommand::Help => return Some(HELP.to_string()),
            ConsoleCommand::Quit => {}
        }

        // control commands only report through the playlist events
        None
    }
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.split_whitespace();
        let command = parts.next().unwrap_or_default().to_lowercase();
        let arguments: Vec<&str> = parts.collect();

        match (command.as_str(), arguments.as_slice()) {
            ("play", []) => Ok(ConsoleCommand::Play),
            ("pause", []) => Ok(ConsoleCommand::Pause),
            ("next", []) => Ok(ConsoleCommand::Next),
            ("prev", []) => Ok(ConsoleCommand::Prev),
            ("status", []) => Ok(ConsoleCommand::Status),
            ("list", []) => Ok(ConsoleCommand::List),
            ("help", []) => Ok(ConsoleCommand::Help),
            ("quit" | "exit", []) => Ok(ConsoleCommand::Quit),
            ("add", [name @ .., millis]) if !name.is_empty() => {
                SongConfig::from_str(format!("{}={}", name.join(" "), millis).as_str())
                    .map(ConsoleCommand::Add)
                    .map_err(|e| ConsoleError::InvalidArguments(command.clone(), e.to_string()))
            }
            ("play" | "pause" | "next" | "prev" | "status" | "list" | "help" | "quit" | "exit" | "add", _) => {
                Err(ConsoleError::InvalidArguments(
                    command.clone(),
                    "unexpected number of arguments".to_string(),
                ))
            }
            _ => Err(ConsoleError::UnknownCommand(value.trim().to_string())),
        }
    }
}

/// Run the interactive console until `quit` is read, the input ends or the token is cancelled.
pub async fn run<R, W>(
    playlist: &dyn Playlist,
    reader: R,
    mut writer: W,
    cancellation_token: CancellationToken,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    write_line(&mut writer, HELP).await?;

    loop {
        let line = select! {
            _ = cancellation_token.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            trace!("Console input has been closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match ConsoleCommand::from_str(line.as_str()) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => {
                if let Some(output) = command.execute(playlist).await {
                    write_line(&mut writer, output.as_str()).await?;
                }
            }
            Err(e) => {
                warn!("Invalid console command, {}", e);
                write_line(&mut writer, e.to_string().as_str()).await?;
            }
        }
    }

    debug!("Console main loop ended");
    Ok(())
}

async fn status(playlist: &dyn Playlist) -> String {
    let current = playlist
        .current()
        .await
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string());

    format!(
        "state: {}, current: {}, left: {:?}, tracks: {}",
        playlist.state().await,
        current,
        playlist.left().await,
        playlist.track_count().await
    )
}

async fn list(playlist: &dyn Playlist) -> String {
    let tracks = playlist.tracks().await;
    if tracks.is_empty() {
        return "the playlist is empty".to_string();
    }

    tracks
        .iter()
        .enumerate()
        .map(|(index, track)| format!("{}. {}", index + 1, track))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
