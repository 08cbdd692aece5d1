//! Logging configuration for TuringX Wallet
//!
//! Uses log4rs with appenders:
//! 1. ConsoleAppender - stdout output
//! 2. RollingFileAppender - log files with rotation
//!
//! The [`LoggerManager`] is also handed to the local node so the daemon it
//! launches logs next to the wallet with a matching verbosity.

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

/// File name of the daemon log written by a wallet-managed node
const DAEMON_LOG_FILE: &str = "turingxd.log";

/// Owns the installed logger and exposes its settings to node backends
pub struct LoggerManager {
    log_dir: PathBuf,
    level: LevelFilter,
    handle: Option<log4rs::Handle>,
}

impl std::fmt::Debug for LoggerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerManager")
            .field("log_dir", &self.log_dir)
            .field("level", &self.level)
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

impl LoggerManager {
    /// Install log4rs as the global logger and keep its handle
    pub fn init(log_dir: PathBuf, level: LevelFilter) -> Result<Self, Box<dyn std::error::Error>> {
        let handle = init_logger(&log_dir, level)?;
        Ok(Self {
            log_dir,
            level,
            handle: Some(handle),
        })
    }

    /// A manager that does not touch the global logger
    pub fn detached(log_dir: PathBuf, level: LevelFilter) -> Self {
        Self {
            log_dir,
            level,
            handle: None,
        }
    }

    /// Whether this manager installed the global logger
    pub fn is_installed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Log file the local daemon writes to
    pub fn daemon_log_path(&self) -> PathBuf {
        self.log_dir.join(DAEMON_LOG_FILE)
    }

    /// Daemon verbosity (0 = errors only .. 4 = trace)
    pub fn daemon_log_level(&self) -> u8 {
        match self.level {
            LevelFilter::Off | LevelFilter::Error => 0,
            LevelFilter::Warn => 1,
            LevelFilter::Info => 2,
            LevelFilter::Debug => 3,
            LevelFilter::Trace => 4,
        }
    }
}

/// Initialize log4rs with console and rolling file appenders
///
/// # Log File Configuration
/// - File: `{log_dir}/turingx.1.log`
/// - Max size: 20 MB per file
/// - Max count: 10 files (rotation)
/// - Pattern: `{timestamp} [{level}] {target} - {message}`
pub fn init_logger(
    log_dir: &Path,
    level: LevelFilter,
) -> Result<log4rs::Handle, Box<dyn std::error::Error>> {
    let config = build_config(log_dir, level)?;
    Ok(log4rs::init_config(config)?)
}

fn build_config(log_dir: &Path, level: LevelFilter) -> Result<Config, Box<dyn std::error::Error>> {
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build();

    std::fs::create_dir_all(log_dir)?;

    let log_file = log_dir.join("turingx.1.log");
    let log_pattern = log_dir.join("turingx.{}.log");
    let log_pattern = log_pattern
        .to_str()
        .ok_or("log directory is not valid UTF-8")?;

    // Rolling file appender (20MB per file, 10 files max)
    let roller = FixedWindowRoller::builder().base(1).build(log_pattern, 10)?;
    let trigger = SizeTrigger::new(20 * 1024 * 1024);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let logfile = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(log_file, Box::new(policy))?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(
            Root::builder()
                .appender("console")
                .appender("logfile")
                .build(level),
        )?;

    Ok(config)
}
