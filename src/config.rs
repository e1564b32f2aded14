//! Watcher configuration
//!
//! Controls where a monitoring session reports its samples. At least one
//! output (trace log or terminal display) has to be enabled, otherwise the
//! session would measure energy nobody can observe.
//!
//! # Examples
//!
//! ```ignore
//! let config = WatcherConfig::new(Some("power.log".into()), true)
//!     .with_signal_handling(false);
//! config.validate()?;
//! ```

use crate::utils::errors::MonitoringError;
use std::path::PathBuf;

/// Environment variable holding the trace log path
pub const LOGFILE_ENV: &str = "POWER_WATCHER_LOGFILE";
/// Environment variable toggling the terminal status line
pub const DISPLAY_ENV: &str = "POWER_WATCHER_DISPLAY";

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Trace log path, created or truncated at session start
    pub logfile: Option<PathBuf>,
    /// Overwrite a status line on stdout after every sample
    pub display: bool,
    /// Turn SIGINT/SIGTERM into a graceful stop of the worker (default: true)
    pub handle_signals: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            logfile: None,
            display: false,
            handle_signals: true,
        }
    }
}

impl WatcherConfig {
    pub fn new(logfile: Option<PathBuf>, display: bool) -> Self {
        Self {
            logfile,
            display,
            ..Self::default()
        }
    }

    pub fn with_logfile(mut self, logfile: impl Into<PathBuf>) -> Self {
        self.logfile = Some(logfile.into());
        self
    }

    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    pub fn with_signal_handling(mut self, handle_signals: bool) -> Self {
        self.handle_signals = handle_signals;
        self
    }

    /// Build a configuration from `POWER_WATCHER_LOGFILE` and `POWER_WATCHER_DISPLAY`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let logfile = lookup(LOGFILE_ENV)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        let display = lookup(DISPLAY_ENV)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);
        Self::new(logfile, display)
    }

    /// Reject sessions that would have no observable output
    pub fn validate(&self) -> Result<(), MonitoringError> {
        if self.logfile.is_none() && !self.display {
            return Err(MonitoringError::ConfigurationError(
                "You should log and/or display consumption".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
