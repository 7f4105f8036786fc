//! The node's single periodic timer.
//!
//! A hardware timer is armed once with a period and a hook. Re-arming is not
//! supported: the node owns exactly one timer.

#![deny(unsafe_code)]

use crate::device::Device;

/// Errors returned when arming the timer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A period of zero was requested.
    InvalidPeriod,
    /// The timer has already been armed.
    AlreadyArmed,
    /// The hardware refused to arm the timer.
    Hardware,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InvalidPeriod => defmt::write!(f, "InvalidPeriod"),
            Error::AlreadyArmed => defmt::write!(f, "AlreadyArmed"),
            Error::Hardware => defmt::write!(f, "Hardware"),
        }
    }
}

/// A recurring hardware timer.
///
/// Once armed the timer calls [`Device::on_timer`] every `period_ms`
/// milliseconds, in whatever context the platform delivers timer events.
pub trait HardwareTimer {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Arm the timer with an auto-reloading period
    fn arm(&mut self, period_ms: u32, hook: &'static dyn Device) -> Result<(), Self::Error>;
}

/// Arms the hardware timer at most once.
#[derive(Debug)]
pub struct TimerService<T: HardwareTimer> {
    timer: T,
    period_ms: Option<u32>,
}

impl<T: HardwareTimer> TimerService<T> {
    /// Wraps an unarmed hardware timer.
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            period_ms: None,
        }
    }

    /// Arms the timer so that `hook` ticks every `period_ms` milliseconds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPeriod`] for a zero period, [`Error::AlreadyArmed`] on a
    /// second call and [`Error::Hardware`] if arming fails. A failed call
    /// leaves the service unarmed.
    pub fn register(&mut self, period_ms: u32, hook: &'static dyn Device) -> Result<(), Error> {
        if period_ms == 0 {
            return Err(Error::InvalidPeriod);
        }
        if self.period_ms.is_some() {
            return Err(Error::AlreadyArmed);
        }

        self.timer
            .arm(period_ms, hook)
            .map_err(|_| Error::Hardware)?;
        self.period_ms = Some(period_ms);
        Ok(())
    }

    /// The armed period, if any.
    pub fn period_ms(&self) -> Option<u32> {
        self.period_ms
    }

    /// Whether the timer has been armed.
    pub fn is_armed(&self) -> bool {
        self.period_ms.is_some()
    }

    /// The hardware timer.
    pub fn timer(&self) -> &T {
        &self.timer
    }
}
