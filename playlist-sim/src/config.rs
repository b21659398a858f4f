use derive_more::Display;
use playlist_sim_core::core::song::{BasicSong, Song};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use std::{fs, io, result};
use thiserror::Error;

/// The result type of loading the playlist configuration.
pub type Result<T> = result::Result<T, ConfigError>;

/// The errors which can occur while loading the playlist configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read the playlist file, {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse the playlist file, {0}")]
    Parse(String),
    #[error("invalid song \"{0}\", {1}")]
    InvalidSong(String, String),
}

impl PartialEq for ConfigError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConfigError::Io(a), ConfigError::Io(b)) => a.kind() == b.kind(),
            (ConfigError::Parse(_), ConfigError::Parse(_)) => true,
            (ConfigError::InvalidSong(a, _), ConfigError::InvalidSong(b, _)) => a == b,
            _ => false,
        }
    }
}

/// A song definition of the playlist configuration.
#[derive(Debug, Display, Clone, PartialEq, Serialize, Deserialize)]
#[display("{name}={duration_ms}")]
pub struct SongConfig {
    pub name: String,
    pub duration_ms: u64,
}

impl SongConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Verify that the song can be played.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidSong(
                self.to_string(),
                "name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Convert the definition into a playable song.
    pub fn into_song(self) -> Arc<dyn Song> {
        let duration = self.duration();
        Arc::new(BasicSong::new(self.name, duration))
    }
}

/// Parse a song from its `NAME=MILLIS` notation.
impl FromStr for SongConfig {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self> {
        let (name, millis) = value.rsplit_once('=').ok_or_else(|| {
            ConfigError::InvalidSong(value.to_string(), "expected NAME=MILLIS".to_string())
        })?;
        let duration_ms = millis.trim().parse::<u64>().map_err(|e| {
            ConfigError::InvalidSong(
                value.to_string(),
                format!("duration \"{}\" is not a positive number of millis, {}", millis, e),
            )
        })?;
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidSong(
                value.to_string(),
                "name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            name: name.trim().to_string(),
            duration_ms,
        })
    }
}

/// The playlist file contents.
///
/// ```yaml
/// songs:
///   - name: Intro
///     duration_ms: 1500
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistConfig {
    #[serde(default)]
    pub songs: Vec<SongConfig>,
}

impl PlaylistConfig {
    /// Load the playlist from the given yaml file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(contents.as_str())
    }

    /// Parse the playlist from the given yaml contents.
    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: PlaylistConfig =
            serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        for song in config.songs.iter() {
            song.validate()?;
        }

        Ok(config)
    }
}
