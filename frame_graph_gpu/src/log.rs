//! Logging for the frame graph GPU layer
//!
//! Every subsystem reports through the `engine_*` macros with a
//! `"framegraph::Component"` source tag. Output goes to the logger installed
//! with `Engine::set_logger`, by default a colored console logger that hides
//! per-handle TRACE chatter.

use colored::*;
use std::fmt;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Destination for engine log entries
///
/// # Example
///
/// ```no_run
/// use frame_graph_gpu::framegraph::log::{Logger, LogEntry, LogSeverity};
///
/// /// Keeps only allocator and retirement warnings
/// struct LifetimeWarnings;
///
/// impl Logger for LifetimeWarnings {
///     fn log(&self, entry: &LogEntry) {
///         let relevant = entry.is_from("framegraph::ResourceAllocator")
///             || entry.is_from("framegraph::FrameSlotRetirementTable");
///         if relevant && entry.severity >= LogSeverity::Warn {
///             eprintln!("{}", entry.message);
///         }
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,

    /// Component tag, e.g. "framegraph::StagingManager" or "framegraph::vulkan::readback"
    pub source: String,

    pub message: String,

    /// Set by `engine_error!`, `engine_err!` and `engine_bail!`
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl LogEntry {
    /// True if the entry's source tag is `component` or one of its sub-components
    pub fn is_from(&self, component: &str) -> bool {
        match self.source.strip_prefix(component) {
            Some(rest) => rest.is_empty() || rest.starts_with("::"),
            None => false,
        }
    }

    /// `file:line` for entries that carry it
    pub fn location(&self) -> Option<String> {
        match (self.file, self.line) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Per-handle destruction, cache hits, staging reuse
    Trace,
    /// Plan rebuilds, pool growth, drain counts
    Debug,
    /// Device and context lifecycle
    Info,
    /// Authoring mistakes with a fallback, skipped draws, timeouts
    Warn,
    /// Failed device calls (carries file:line)
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the console logger
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().trim_end())
    }
}

/// Colored console logger
///
/// Lines look like `[timestamp] [SEVERITY] [source] message (file:line)`.
/// WARN and ERROR go to stderr, the rest to stdout. Entries below
/// `min_severity` are dropped.
#[derive(Debug, Clone, Copy)]
pub struct DefaultLogger {
    pub min_severity: LogSeverity,
}

impl DefaultLogger {
    pub fn with_min_severity(min_severity: LogSeverity) -> Self {
        Self { min_severity }
    }

    /// True if an entry of this severity is printed
    pub fn accepts(&self, severity: LogSeverity) -> bool {
        severity >= self.min_severity
    }
}

impl Default for DefaultLogger {
    fn default() -> Self {
        Self { min_severity: LogSeverity::Debug }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        if !self.accepts(entry.severity) {
            return;
        }
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");

        let label = entry.severity.label();
        let severity = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };

        let mut line = format!("[{}] [{}] [{}] {}", timestamp, severity, entry.source.bright_blue(), entry.message);
        if let Some(location) = entry.location() {
            line.push_str(&format!(" ({})", location));
        }

        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

// ===== LOGGING MACROS =====

#[doc(hidden)]
#[macro_export]
macro_rules! __engine_log {
    ($severity:ident, $source:expr, $($arg:tt)*) => {
        $crate::framegraph::Engine::log(
            $crate::framegraph::log::LogSeverity::$severity,
            $source,
            format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Trace, $source, $($arg)*) };
}

/// # Example
///
/// ```no_run
/// # use frame_graph_gpu::engine_debug;
/// # let groups = 3;
/// engine_debug!("framegraph::ResourceAllocator", "Rebuilt {} alias groups", groups);
/// ```
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Debug, $source, $($arg)*) };
}

#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Info, $source, $($arg)*) };
}

/// # Example
///
/// ```no_run
/// # use frame_graph_gpu::engine_warn;
/// engine_warn!("framegraph::IndirectDrawRecorder", "No indirect buffer bound, draw skipped");
/// ```
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Warn, $source, $($arg)*) };
}

/// ERROR with the caller's file:line
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::framegraph::Engine::log_detailed(
            $crate::framegraph::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log at ERROR and evaluate to `Error::BackendError` with the same text
///
/// # Example
///
/// ```no_run
/// # use frame_graph_gpu::engine_err;
/// # fn create() -> Result<u64, i32> { Err(-2) }
/// let pool = create()
///     .map_err(|code| engine_err!("framegraph::vulkan", "vkCreateDescriptorPool failed: {}", code));
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::framegraph::Engine::log_detailed(
            $crate::framegraph::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::framegraph::Error::BackendError(message)
    }};
}

/// `return Err(engine_err!(...))`
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
