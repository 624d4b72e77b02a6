use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

pub use ::log::Level;

/// Destination for leveled analysis diagnostics.
///
/// Sinks are purely observational; the engine never reads anything back.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    /// Whether messages at `level` would be kept. Lets callers skip
    /// formatting expensive values.
    fn enabled(&self, _level: Level) -> bool {
        true
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        (**self).log(level, args)
    }

    fn enabled(&self, level: Level) -> bool {
        (**self).enabled(level)
    }
}

/// Forwards to the `log` facade under the `absint` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl LogSink for LogFacade {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        ::log::log!(target: "absint", level, "{args}");
    }

    fn enabled(&self, level: Level) -> bool {
        ::log::log_enabled!(target: "absint", level)
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl LogSink for Silent {
    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether some line at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, args.to_string()));
    }
}
