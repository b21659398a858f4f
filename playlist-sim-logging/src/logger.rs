use crate::{Error, Result};

use log::{debug, info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::{Config, Handle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const LOG_FORMAT_CONSOLE: &str = "\x1B[37m{d(%Y-%m-%d %H:%M:%S%.3f)}\x1B[0m {h({l:>5.5})} \x1B[37m---\x1B[0m \x1B[37m[{T:>15.15}]\x1B[0m \x1B[36m{t:<45.45}\x1B[0m \x1B[37m:\x1B[0m {m}{n}";
const LOG_FORMAT_FILE: &str =
    "{d(%Y-%m-%d %H:%M:%S%.3f)} {l:>5.5} --- [{T:>15.15}] {t:<45.45} : {m}{n}";
const CONSOLE_APPENDER: &str = "stdout";
const FILE_APPENDER: &str = "file";
const LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;
const LOG_FILE_ROLL_PATTERN: &str = "playlist-sim.{}.log";
const LOG_FILE_ROLL_COUNT: u32 = 3;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// The process wide logger of the playlist simulator.
///
/// Only one instance can be created per process,
/// any further attempt results in [Error::AlreadyInitialized].
#[derive(Debug)]
pub struct SimLogger {
    handle: Handle,
}

impl SimLogger {
    /// Returns a builder instance for the logger.
    pub fn builder() -> SimLoggerBuilder {
        SimLoggerBuilder::default()
    }

    /// Create and activate a new logger.
    ///
    /// # Arguments
    ///
    /// * `root_level` - The level of the root logger.
    /// * `config_path` - The optional `log4rs` yaml config, replacing all other options when given.
    /// * `log_path` - The optional rolling log file to write to next to the console.
    /// * `loggers` - The level overrides per package.
    pub fn new(
        root_level: LevelFilter,
        config_path: Option<impl AsRef<Path>>,
        log_path: Option<impl AsRef<Path>>,
        loggers: Vec<(String, LevelFilter)>,
    ) -> Result<Self> {
        let config = match config_path {
            Some(path) => Self::load_from_config(path)?,
            None => Self::create_config(root_level, log_path, loggers)?,
        };

        if INITIALIZED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyInitialized);
        }

        let handle = log4rs::init_config(config).map_err(|e| {
            INITIALIZED.store(false, Ordering::Release);
            Error::InvalidConfig(e.to_string())
        })?;
        info!("Playlist simulator logger has been initialized");
        Ok(Self { handle })
    }

    /// Returns the maximum level which will be logged.
    pub fn root_log_level(&self) -> LevelFilter {
        self.handle.max_log_level()
    }

    fn load_from_config(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_string_lossy().to_string()));
        }

        log4rs::config::load_config_file(path, Default::default())
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    fn create_config(
        root_level: LevelFilter,
        log_path: Option<impl AsRef<Path>>,
        loggers: Vec<(String, LevelFilter)>,
    ) -> Result<Config> {
        let mut root = Root::builder().appender(CONSOLE_APPENDER);
        let mut config_builder = Config::builder().appender(
            Appender::builder().build(
                CONSOLE_APPENDER,
                Box::new(
                    ConsoleAppender::builder()
                        .encoder(Box::new(PatternEncoder::new(LOG_FORMAT_CONSOLE)))
                        .build(),
                ),
            ),
        );

        if let Some(path) = log_path {
            config_builder = config_builder.appender(Self::create_file_appender(path)?);
            root = root.appender(FILE_APPENDER);
        }

        for (logger, level) in loggers.into_iter() {
            config_builder = config_builder.logger(Logger::builder().build(logger, level));
        }

        config_builder
            .build(root.build(root_level))
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    fn create_file_appender(path: impl AsRef<Path>) -> Result<Appender> {
        let path = path.as_ref();
        let directory = path
            .parent()
            .filter(|e| !e.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;

        let roll_pattern = directory.join(LOG_FILE_ROLL_PATTERN);
        let roller = FixedWindowRoller::builder()
            .base(1)
            .build(
                roll_pattern.to_string_lossy().as_ref(),
                LOG_FILE_ROLL_COUNT,
            )
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let policy = CompoundPolicy::new(
            Box::new(SizeTrigger::new(LOG_FILE_SIZE)),
            Box::new(roller),
        );

        debug!("Writing log file to {:?}", path);
        Ok(Appender::builder().build(
            FILE_APPENDER,
            Box::new(
                RollingFileAppender::builder()
                    .encoder(Box::new(PatternEncoder::new(LOG_FORMAT_FILE)))
                    .append(false)
                    .build(path, Box::new(policy))?,
            ),
        ))
    }
}

/// The builder of the [SimLogger].
#[derive(Debug, Default)]
pub struct SimLoggerBuilder {
    root_level: Option<LevelFilter>,
    config_path: Option<PathBuf>,
    log_path: Option<PathBuf>,
    loggers: HashMap<String, LevelFilter>,
}

impl SimLoggerBuilder {
    /// Set the root level of the logger.
    pub fn root_level(&mut self, level: LevelFilter) -> &mut Self {
        self.root_level = Some(level);
        self
    }

    /// Set the path of the `log4rs` yaml config to load.
    pub fn config_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the log file path of the logger.
    pub fn log_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add a log level filter for the given package.
    pub fn logger<S: AsRef<str>>(&mut self, package: S, level: LevelFilter) -> &mut Self {
        self.loggers.insert(package.as_ref().to_string(), level);
        self
    }

    /// Consumes the builder options and activates a new logger.
    pub fn build(&mut self) -> Result<SimLogger> {
        let root_level = self.root_level.take().unwrap_or(LevelFilter::Info);
        let config_path = self.config_path.take();
        let log_path = self.log_path.take();
        let loggers = self.loggers.drain().collect::<Vec<_>>();

        SimLogger::new(root_level, config_path, log_path, loggers)
    }
}
