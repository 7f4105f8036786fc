//! Remote debug channel for sensor nodes.
//!
//! Every debug line goes to two places: the local console and a retained
//! message on the node's debug output topic (`debug/sensor/<name>/out`), so the
//! last line is visible to anyone subscribing later. Lines are filtered by a
//! [`DebugLevel`] threshold that can be changed remotely through the control
//! topic.
//!
//! # Usage
//!
//! ```rust
//! use sensorbase::debug::{DebugLevel, Log};
//!
//! struct Collect(DebugLevel, Vec<String>);
//!
//! impl Log for Collect {
//!     fn level(&self) -> DebugLevel {
//!         self.0
//!     }
//!     fn emit(&mut self, message: &str) {
//!         self.1.push(message.to_string());
//!     }
//! }
//!
//! let mut log = Collect(DebugLevel::Normal, Vec::new());
//! log.print("visible");
//! log.log(DebugLevel::Verbose, "filtered out");
//! log.log_fmt(DebugLevel::Normal, format_args!("reading {}", 21));
//! assert_eq!(log.1, ["visible", "reading 21"]);
//! ```

use core::fmt::{self, Write as _};
use heapless::String;

use crate::network::Broker;

mod level;

pub use level::{DebugLevel, DebugLevelCell};

/// Size of the on-stack buffer used by [`Log::log_fmt`].
///
/// Longer lines are formatted into a heap buffer that is freed right after
/// the line is emitted.
pub const STACK_BUFFER_SIZE: usize = 64;

/// A severity-filtered line sink.
///
/// Implementors provide the current threshold and the raw emission; filtering
/// and formatting are provided.
pub trait Log {
    /// The current threshold.
    fn level(&self) -> DebugLevel;

    /// Emits a line unconditionally.
    fn emit(&mut self, message: &str);

    /// Whether a message of `severity` passes the current threshold.
    fn enabled(&self, severity: DebugLevel) -> bool {
        self.level().allows(severity)
    }

    /// Emits `message` if `severity` passes the threshold.
    fn log(&mut self, severity: DebugLevel, message: &str) {
        if self.enabled(severity) {
            self.emit(message);
        }
    }

    /// Shorthand for logging at [`DebugLevel::Normal`].
    fn print(&mut self, message: &str) {
        self.log(DebugLevel::Normal, message);
    }

    /// Formats and emits a line if `severity` passes the threshold.
    ///
    /// Nothing is formatted when the line is filtered out. A line whose
    /// arguments fail to format is dropped.
    fn log_fmt(&mut self, severity: DebugLevel, args: fmt::Arguments<'_>) {
        if !self.enabled(severity) {
            return;
        }

        let mut line: String<STACK_BUFFER_SIZE> = String::new();
        if line.write_fmt(args).is_ok() {
            self.emit(&line);
            return;
        }

        let mut length = Measure(0);
        if length.write_fmt(args).is_err() || length.0 <= STACK_BUFFER_SIZE {
            return;
        }
        let mut line = alloc::string::String::with_capacity(length.0);
        if line.write_fmt(args).is_ok() {
            self.emit(&line);
        }
    }
}

/// Counts formatted bytes; never fails on its own.
struct Measure(usize);

impl fmt::Write for Measure {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

impl<L: Log + ?Sized> Log for &mut L {
    fn level(&self) -> DebugLevel {
        (**self).level()
    }

    fn emit(&mut self, message: &str) {
        (**self).emit(message)
    }
}

/// The node's debug sink: console plus retained publish on the output topic.
///
/// The sink borrows its parts for the duration of one or more log calls. It
/// never retries: a publish that fails because the broker session is down is
/// dropped, the line still reaches the console.
pub struct DebugSink<'a, W, B>
where
    W: fmt::Write,
    B: Broker,
{
    levels: &'a DebugLevelCell,
    topic: &'a str,
    console: &'a mut W,
    broker: &'a mut B,
}

impl<'a, W, B> DebugSink<'a, W, B>
where
    W: fmt::Write,
    B: Broker,
{
    /// Creates a sink publishing to `topic`.
    pub fn new(
        levels: &'a DebugLevelCell,
        topic: &'a str,
        console: &'a mut W,
        broker: &'a mut B,
    ) -> Self {
        Self {
            levels,
            topic,
            console,
            broker,
        }
    }
}

impl<W, B> Log for DebugSink<'_, W, B>
where
    W: fmt::Write,
    B: Broker,
{
    fn level(&self) -> DebugLevel {
        self.levels.get()
    }

    fn emit(&mut self, message: &str) {
        let _ = writeln!(self.console, "{}", message);
        let _ = self.broker.publish(self.topic, message.as_bytes(), true);
    }
}

impl<W, B> fmt::Debug for DebugSink<'_, W, B>
where
    W: fmt::Write,
    B: Broker,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugSink")
            .field("level", &self.levels.get())
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

/// Formats a debug line at the given level.
///
/// The first argument is anything implementing [`Log`], typically a
/// [`SensorNode`](crate::system::SensorNode).
///
/// ```rust
/// use sensorbase::debug::{DebugLevel, Log};
/// use sensorbase::debug_printf;
///
/// struct Stdout;
/// impl Log for Stdout {
///     fn level(&self) -> DebugLevel {
///         DebugLevel::Verbose
///     }
///     fn emit(&mut self, message: &str) {
///         println!("{message}");
///     }
/// }
///
/// let mut out = Stdout;
/// debug_printf!(out, DebugLevel::Information, "temperature {:.1}", 21.5);
/// ```
#[macro_export]
macro_rules! debug_printf {
    ($target:expr, $level:expr, $($arg:tt)+) => {
        $crate::debug::Log::log_fmt(&mut $target, $level, ::core::format_args!($($arg)+))
    };
}
