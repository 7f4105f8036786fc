//! # sensorbase - runtime base for networked sensor nodes
//!
//! A small runtime that turns device-specific sensing code into a remotely
//! observable node on a publish/subscribe broker. It associates with the
//! network, keeps a broker session, exposes a remote debug channel, decodes
//! inbound JSON messages, drives a periodic timer and services an
//! over-the-air update listener. This library is designed for embedded
//! systems and supports `no_std` environments.
//!
//! ## Features
//!
//! ### Remote debug channel
//! - Every debug line is written to the console and published, retained, to
//!   `debug/sensor/<name>/out`
//! - The verbosity is changed at run time by publishing
//!   `{"debuglevel": 0..3}` to `debug/sensor/<name>/in`
//!
//! ### Connectivity
//! - Blocking association and broker connection with configurable retries
//! - A lost broker session restarts the node
//!
//! ### Messages
//! - Fixed-capacity JSON object decoder, no allocation
//! - Inbound messages are forwarded raw to the device
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sensorbase = "0.1.0"
//! ```
//!
//! ### Writing a device
//!
//! ```rust
//! use core::sync::atomic::{AtomicU32, Ordering};
//! use sensorbase::device::Device;
//!
//! struct Thermometer {
//!     ticks: AtomicU32,
//! }
//!
//! impl Device for Thermometer {
//!     fn on_timer(&self) {
//!         self.ticks.fetch_add(1, Ordering::Relaxed);
//!     }
//!
//!     fn on_message(&self, topic: &str, payload: &[u8]) {
//!         let _ = (topic, payload);
//!     }
//! }
//!
//! static THERMOMETER: Thermometer = Thermometer { ticks: AtomicU32::new(0) };
//! THERMOMETER.on_timer();
//! assert_eq!(THERMOMETER.ticks.load(Ordering::Relaxed), 1);
//! ```
//!
//! The device is then handed to a [`system::SensorNode`] together with the
//! board's [`system::Platform`], network station, broker session, update
//! listener and hardware timer.
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (Xtensa, RISC-V, ARM Cortex-M)
//! - Linux hosts, through the `std` feature's hosted platform
//! - Any platform supporting Rust's `core` and `alloc` libraries
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support and the hosted platform (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

extern crate alloc;

/// Node configuration: identity, credentials and derived topics.
pub mod config;

/// Structured message decoder.
///
/// Decodes inbound JSON objects into a key/value tree held in fixed buffers.
pub mod codec;

/// Remote debug channel and verbosity levels.
pub mod debug;

/// The device-specific capability the runtime calls into.
pub mod device;

/// Network abstraction layer: station and broker traits and the connection
/// retry loops built on them.
pub mod network;

/// Over-the-air (OTA) update listener interface and event reporting.
pub mod ota;

/// Inbound message dispatch.
pub mod router;

/// System layer: platform seam and lifecycle supervisor.
pub mod system;

/// The node's periodic timer.
pub mod timer;
