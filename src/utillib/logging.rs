//! Process-wide verbosity for progress messages on stderr. Set once
//! from the command line (`LogLevelOpt`), read by the `info!` and
//! `debug!` macros.

use std::sync::atomic::{AtomicU8, Ordering};

// Fields stay private, go through `From<LogLevelOpt> for LogLevel`.
#[derive(Debug, clap::Args)]
pub struct LogLevelOpt {
    /// Report which measurement files are loaded, skipped and
    /// reduced
    #[clap(short, long)]
    verbose: bool,

    /// Additionally show the individual reduced values and other
    /// details useful when debugging this program (implies
    /// `--verbose`)
    #[clap(short, long)]
    debug: bool,
}

impl From<LogLevelOpt> for LogLevel {
    fn from(value: LogLevelOpt) -> Self {
        match value {
            LogLevelOpt {
                verbose: false,
                debug: false,
            } => LogLevel::None,
            LogLevelOpt {
                verbose: true,
                debug: false,
            } => LogLevel::Info,
            LogLevelOpt {
                verbose: _,
                debug: true,
            } => LogLevel::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Silent, only results go to stdout
    None,
    /// What is being loaded or skipped
    Info,
    /// Everything, for debugging this program
    Debug,
}

impl LogLevel {
    // Only for comparisons, not public.
    fn level(self) -> u8 {
        self as u8
    }

    fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(LogLevel::None),
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level().cmp(&other.level())
    }
}

static LOGLEVEL: AtomicU8 = AtomicU8::new(0);

pub fn set_log_level(val: LogLevel) {
    LOGLEVEL.store(val.level(), Ordering::Relaxed);
}

#[inline]
pub fn log_level() -> LogLevel {
    // Only `set_log_level` stores, and it stores valid levels.
    LogLevel::from_level(LOGLEVEL.load(Ordering::Relaxed)).unwrap_or(LogLevel::Debug)
}

#[macro_export]
macro_rules! info {
    { $($arg:tt)* } => {
        if $crate::utillib::logging::log_level() >= $crate::utillib::logging::LogLevel::Info {
            eprintln!($($arg)*);
        }
    }
}

#[macro_export]
macro_rules! debug {
    { $($arg:tt)* } => {
        if $crate::utillib::logging::log_level() >= $crate::utillib::logging::LogLevel::Debug {
            eprintln!($($arg)*);
        }
    }
}
