//! Shared utilities

pub mod logger;
pub mod timer;

pub use logger::{init_logger, LogHook, LogLevel, NoopLogger, RunLogger, TracingLogger};
pub use timer::Timer;
