//! Logging utilities
//!
//! Provides subscriber setup for the binary and the logging hook the
//! coordinator reports through.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Initialize the global subscriber. Later calls are ignored.
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::new(format!("gridrun={}", level.to_tracing_level()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// Logger the coordinator reports run and cell events to
pub trait RunLogger: Send + Sync {
    fn debug_enabled(&self) -> bool;
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl RunLogger for TracingLogger {
    fn debug_enabled(&self) -> bool {
        tracing::enabled!(Level::DEBUG)
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl RunLogger for NoopLogger {
    fn debug_enabled(&self) -> bool {
        false
    }

    fn debug(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// Best-effort wrapper around an optional [`RunLogger`].
///
/// A missing logger or one that panics never affects the caller.
#[derive(Clone, Default)]
pub struct LogHook {
    logger: Option<Arc<dyn RunLogger>>,
}

impl LogHook {
    pub fn new(logger: Arc<dyn RunLogger>) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    pub fn none() -> Self {
        Self { logger: None }
    }

    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingLogger))
    }

    pub fn debug_enabled(&self) -> bool {
        match &self.logger {
            Some(logger) => {
                catch_unwind(AssertUnwindSafe(|| logger.debug_enabled())).unwrap_or(false)
            }
            None => false,
        }
    }

    /// Message is only built when debug output is enabled
    pub fn debug(&self, message: impl FnOnce() -> String) {
        if !self.debug_enabled() {
            return;
        }
        if let Some(logger) = &self.logger {
            let _ = catch_unwind(AssertUnwindSafe(|| logger.debug(&message())));
        }
    }

    pub fn error(&self, message: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            let _ = catch_unwind(AssertUnwindSafe(|| logger.error(&message())));
        }
    }
}

impl std::fmt::Debug for LogHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHook")
            .field("enabled", &self.logger.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{PanickingLogger, RecordingLogger};

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("unknown".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_hook_forwards_messages() {
        let recording = Arc::new(RecordingLogger::default());
        let hook = LogHook::new(recording.clone());

        hook.debug(|| "start".to_string());
        hook.error(|| "failed".to_string());

        assert_eq!(recording.lines(), vec!["debug start", "error failed"]);
    }

    #[test]
    fn test_hook_without_logger_is_silent() {
        let hook = LogHook::none();
        assert!(!hook.debug_enabled());
        hook.debug(|| unreachable!("message built without a logger"));
        hook.error(|| "ignored".to_string());
    }

    #[test]
    fn test_hook_swallows_logger_panics() {
        let hook = LogHook::new(Arc::new(PanickingLogger));
        hook.debug(|| "start".to_string());
        hook.error(|| "failed".to_string());
    }
}
