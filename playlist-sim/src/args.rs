use crate::config::SongConfig;

use clap::Parser;
use derive_more::Display;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// The command line options of the playlist simulator.
#[derive(Debug, Clone, Display, Parser)]
#[command(name = "playlist-sim", version, about = "Plays a simulated playlist of songs")]
#[display("songs: {}, playlist: {:?}, interactive: {}", songs.len(), playlist, interactive)]
pub struct PlaylistSimArgs {
    /// A song to append to the playlist, formatted as `NAME=MILLIS`.
    #[arg(long = "song", value_name = "NAME=MILLIS")]
    pub songs: Vec<SongConfig>,
    /// The yaml file containing the songs to append to the playlist.
    /// These songs are appended before the songs given through `--song`.
    #[arg(long, value_name = "FILE")]
    pub playlist: Option<PathBuf>,
    /// The resolution in millis at which the playback is counted down.
    #[arg(long, default_value_t = 10)]
    pub tick_resolution_ms: u64,
    /// The root log level.
    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
    /// The rolling log file to write to, next to the console.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
    /// The `log4rs` yaml config to use instead of the console logger.
    #[arg(long, value_name = "FILE")]
    pub log_config: Option<PathBuf>,
    /// Disable the `log4rs` logger of the simulator.
    #[arg(long, default_value_t = false)]
    pub disable_logger: bool,
    /// Read playlist commands from stdin.
    #[arg(long, default_value_t = false)]
    pub interactive: bool,
    /// Don't start playing the playlist on startup.
    #[arg(long, default_value_t = false)]
    pub no_autoplay: bool,
}

impl PlaylistSimArgs {
    pub fn tick_resolution(&self) -> Duration {
        Duration::from_millis(self.tick_resolution_ms)
    }
}

impl Default for PlaylistSimArgs {
    fn default() -> Self {
        Self {
            songs: vec![],
            playlist: None,
            tick_resolution_ms: 10,
            log_level: LevelFilter::Info,
            log_file: None,
            log_config: None,
            disable_logger: false,
            interactive: false,
            no_autoplay: false,
        }
    }
}
