#![deny(unsafe_code)]

//! # Over-the-Air (OTA) Update Service
//!
//! Firmware transfer itself belongs to the platform: a listener on the node
//! accepts an image pushed by a development host, authenticates it and writes
//! it to flash. This module only describes that service and turns its events
//! into console lines.
//!
//! ## Design
//!
//! The service is started once during setup with an [`UpdateConfig`] and then
//! polled from the main cycle. Each poll yields at most one [`Event`]. The
//! node folds those events into an [`UpdateState`]:
//!
//! * `Idle`: no transfer has started.
//! * `Receiving`: a transfer is in progress.
//! * `Finished`: the last transfer completed. The platform normally reboots
//!   into the new image shortly after.
//! * `Failed`: the last transfer was aborted with an [`Error`].
//!
//! ```rust
//! use sensorbase::ota::{Error, Event, UpdateState};
//!
//! let state = UpdateState::Idle
//!     .next(Event::Start)
//!     .next(Event::Progress { done: 512, total: 1024 })
//!     .next(Event::Error(Error::Receive));
//! assert_eq!(state, UpdateState::Failed);
//! ```

use core::fmt::Write;

/// Default port the update listener binds to.
pub const DEFAULT_PORT: u16 = 8266;

/// Update service failures, numbered as the listener reports them.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Error {
    /// The host failed authentication.
    Auth = 0,
    /// The image could not be started, e.g. not enough flash.
    Begin = 1,
    /// The listener could not connect back to the host.
    Connect = 2,
    /// The transfer broke off.
    Receive = 3,
    /// The received image failed final verification.
    End = 4,
}

impl Error {
    /// Numeric code of the error.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Name of the failed step.
    pub fn name(self) -> &'static str {
        match self {
            Error::Auth => "Auth",
            Error::Begin => "Begin",
            Error::Connect => "Connect",
            Error::Receive => "Receive",
            Error::End => "End",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}({})", self.name(), self.code())
    }
}

/// Progress reported by the update service.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
    /// A transfer was accepted.
    Start,
    /// `done` of `total` bytes have been written.
    Progress {
        /// Bytes received so far.
        done: u32,
        /// Size of the image.
        total: u32,
    },
    /// The image was received and verified.
    End,
    /// The transfer was aborted.
    Error(Error),
}

/// Where the node stands with respect to firmware updates.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum UpdateState {
    /// No transfer has started.
    #[default]
    Idle,
    /// A transfer is in progress.
    Receiving,
    /// The last transfer completed.
    Finished,
    /// The last transfer failed.
    Failed,
}

impl UpdateState {
    /// The state after `event`.
    pub fn next(self, event: Event) -> Self {
        match event {
            Event::Start | Event::Progress { .. } => UpdateState::Receiving,
            Event::End => UpdateState::Finished,
            Event::Error(_) => UpdateState::Failed,
        }
    }
}

/// How the update listener identifies itself and authenticates hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateConfig<'a> {
    /// Port to listen on.
    pub port: u16,
    /// Host name announced to development hosts. Sensor nodes use their name.
    pub hostname: &'a str,
    /// Password a host must present. An empty password disables
    /// authentication.
    pub password: &'a str,
}

impl<'a> UpdateConfig<'a> {
    /// A configuration on [`DEFAULT_PORT`].
    pub fn new(hostname: &'a str, password: &'a str) -> Self {
        Self {
            port: DEFAULT_PORT,
            hostname,
            password,
        }
    }
}

/// A firmware update listener.
pub trait UpdateService {
    /// Start listening
    fn begin(&mut self, config: &UpdateConfig<'_>) -> Result<(), Error>;
    /// Service the listener and return the next event, if any
    fn poll(&mut self) -> Option<Event>;
}

/// An update service that never sees a transfer, for nodes without OTA.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disabled;

impl UpdateService for Disabled {
    fn begin(&mut self, _config: &UpdateConfig<'_>) -> Result<(), Error> {
        Ok(())
    }

    fn poll(&mut self) -> Option<Event> {
        None
    }
}

/// Writes the console line for `event`.
///
/// ```rust
/// use sensorbase::ota::{report, Error, Event};
///
/// let mut out = String::new();
/// report(&mut out, Event::Progress { done: 300, total: 1200 }).unwrap();
/// report(&mut out, Event::Error(Error::Auth)).unwrap();
/// assert_eq!(out, "Progress: 25%\r\nError[0]: Auth Failed\n");
/// ```
pub fn report<W: Write + ?Sized>(console: &mut W, event: Event) -> core::fmt::Result {
    match event {
        Event::Start => writeln!(console, "Starting"),
        Event::Progress { done, total } => {
            writeln!(console, "Progress: {}%\r", percent(done, total))
        }
        Event::End => writeln!(console, "\nEnd"),
        Event::Error(err) => writeln!(console, "Error[{}]: {} Failed", err.code(), err.name()),
    }
}

fn percent(done: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = u64::from(done) * 100 / u64::from(total);
    pct.min(100) as u32
}
