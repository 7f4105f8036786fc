//! System layer of a sensor node.
//!
//! This module ties the crate together. The [`Platform`] trait is the seam to
//! the board (console, delays, reset) and [`SensorNode`] is the supervisor
//! that drives setup and the main cycle on top of it.
//!
//! # Available Utilities
//!
//! - **[`supervisor`]**: ordered setup, main cycle and restart policy
//! - **`hosted`** (`std` feature): a [`Platform`] and timer for running a
//!   node as a desktop process
//!
//! # Usage
//!
//! ```rust,no_run
//! use sensorbase::system::{Parts, Platform, SensorNode};
//! # use sensorbase::config::DeviceConfig;
//! # use sensorbase::device::NoDevice;
//! # fn run<P, S, B, U, T>(config: DeviceConfig<'static>, parts: Parts<P, S, B, U, T>)
//! # where
//! #     P: Platform,
//! #     S: sensorbase::network::Station,
//! #     B: sensorbase::network::Broker,
//! #     U: sensorbase::ota::UpdateService,
//! #     T: sensorbase::timer::HardwareTimer,
//! # {
//! static DEVICE: NoDevice = NoDevice;
//!
//! let mut node = SensorNode::new(config, parts, &DEVICE).unwrap();
//! node.setup().unwrap();
//! node.register_timer(1_000).unwrap();
//! node.run();
//! # }
//! ```

/// Lifecycle supervisor.
///
/// Sequences setup, runs the main cycle and restarts the node when the broker
/// session is lost.
pub mod supervisor;

/// Hosted platform for running a node as a process.
#[cfg(feature = "std")]
pub mod hosted;

pub use supervisor::{Health, Parts, SensorNode};

/// Board services the runtime needs.
///
/// The console is the [`core::fmt::Write`] supertrait: on devices a serial
/// port, on hosts standard output.
pub trait Platform: core::fmt::Write {
    /// Brings up the console. Called once, first thing during setup.
    fn init_console(&mut self) {}

    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Restarts the program from the beginning.
    ///
    /// On hardware this does not return. Implementations that do return
    /// (test doubles) leave the node in an undefined connection state.
    fn restart(&mut self);
}
