//! Running a node as a desktop process.
//!
//! [`StdPlatform`] maps the console to standard output and a restart to
//! process exit, leaving the actual restart to whatever supervises the
//! process. [`ThreadTimer`] ticks the device from a background thread.

use std::io::Write as _;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::device::Device;
use crate::timer::HardwareTimer;

use super::Platform;

/// Exit status used when the node asks to be restarted (`EX_TEMPFAIL`).
pub const RESTART_EXIT_CODE: i32 = 75;

/// Standard output console, sleeping delays, exit-on-restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdPlatform;

impl core::fmt::Write for StdPlatform {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let mut out = std::io::stdout().lock();
        out.write_all(s.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|_| core::fmt::Error)
    }
}

impl Platform for StdPlatform {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    fn restart(&mut self) {
        std::process::exit(RESTART_EXIT_CODE);
    }
}

/// A timer backed by a detached thread.
#[derive(Debug, Default)]
pub struct ThreadTimer {
    handle: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    /// Creates an unarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the timer thread has been started.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl HardwareTimer for ThreadTimer {
    type Error = std::io::Error;

    fn arm(&mut self, period_ms: u32, hook: &'static dyn Device) -> Result<(), Self::Error> {
        let period = Duration::from_millis(u64::from(period_ms));
        let handle = thread::Builder::new()
            .name("sensorbase-timer".into())
            .spawn(move || {
                loop {
                    thread::sleep(period);
                    hook.on_timer();
                }
            })?;
        self.handle = Some(handle);
        Ok(())
    }
}
