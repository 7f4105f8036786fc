//! Debug verbosity levels and the shared cell holding the current one.

use core::sync::atomic::{AtomicU8, Ordering};
use serde::{Deserialize, Deserializer};

/// Severity of a debug message and, at the same time, the verbosity threshold
/// of the node.
///
/// Lower values have higher priority. A message is emitted only when its level
/// is less than or equal to the current threshold, so [`DebugLevel::None`]
/// as threshold suppresses everything.
///
/// ```rust
/// use sensorbase::debug::DebugLevel;
///
/// assert!(DebugLevel::Normal.allows(DebugLevel::Normal));
/// assert!(!DebugLevel::Normal.allows(DebugLevel::Information));
/// assert!(!DebugLevel::None.allows(DebugLevel::Normal));
/// ```
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[repr(u8)]
pub enum DebugLevel {
    /// No output at all.
    None = 0,
    /// Regular operational messages.
    #[default]
    Normal = 1,
    /// Additional diagnostics, e.g. dropped messages.
    Information = 2,
    /// Everything, including a trace of every inbound message.
    Verbose = 3,
}

impl DebugLevel {
    /// Converts a raw remote value into a level.
    ///
    /// Out-of-range values are clamped: anything below zero turns logging off,
    /// anything above three logs everything.
    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            i64::MIN..=0 => DebugLevel::None,
            1 => DebugLevel::Normal,
            2 => DebugLevel::Information,
            _ => DebugLevel::Verbose,
        }
    }

    /// Whether a message of `severity` passes this threshold.
    pub fn allows(self, severity: DebugLevel) -> bool {
        severity <= self
    }

    const fn from_u8(raw: u8) -> Self {
        Self::from_raw(raw as i64)
    }
}

impl<'de> Deserialize<'de> for DebugLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(DebugLevel::from_raw)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DebugLevel {
    fn format(&self, f: defmt::Formatter) {
        match self {
            DebugLevel::None => defmt::write!(f, "None"),
            DebugLevel::Normal => defmt::write!(f, "Normal"),
            DebugLevel::Information => defmt::write!(f, "Information"),
            DebugLevel::Verbose => defmt::write!(f, "Verbose"),
        }
    }
}

/// Process-wide debug threshold.
///
/// The cell is written by the control-topic handler or by device setup code and
/// read by every log call, possibly from timer context. Loads and stores are
/// plain atomics so targets without compare-and-swap are supported.
#[derive(Debug)]
pub struct DebugLevelCell {
    raw: AtomicU8,
}

impl DebugLevelCell {
    /// Creates a cell holding `level`.
    pub const fn new(level: DebugLevel) -> Self {
        Self {
            raw: AtomicU8::new(level as u8),
        }
    }

    /// Returns the current threshold.
    pub fn get(&self) -> DebugLevel {
        DebugLevel::from_u8(self.raw.load(Ordering::Relaxed))
    }

    /// Replaces the current threshold.
    pub fn set(&self, level: DebugLevel) {
        self.raw.store(level as u8, Ordering::Relaxed);
    }

    /// Whether a message of `severity` would currently be emitted.
    pub fn allows(&self, severity: DebugLevel) -> bool {
        self.get().allows(severity)
    }
}

impl Default for DebugLevelCell {
    fn default() -> Self {
        Self::new(DebugLevel::default())
    }
}
