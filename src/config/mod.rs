//! Node identity and credentials.
//!
//! A [`DeviceConfig`] names the node and carries everything needed to reach the
//! network, the broker and the update host. It is usually baked into the
//! firmware as a JSON document:
//!
//! ```rust
//! use sensorbase::config::{DeviceConfig, Topics};
//! use sensorbase::debug::DebugLevel;
//!
//! let config = DeviceConfig::from_json(br#"{
//!     "name": "kitchen",
//!     "wifi_ssid": "home",
//!     "wifi_password": "secret",
//!     "broker_host": "10.0.0.2",
//!     "debug_level": 2
//! }"#).unwrap();
//!
//! assert_eq!(config.broker_port, 1883);
//! assert_eq!(config.ota_port, 8266);
//! assert_eq!(config.debug_level, DebugLevel::Information);
//!
//! let topics = Topics::for_device(config.name).unwrap();
//! assert_eq!(topics.control(), "debug/sensor/kitchen/in");
//! assert_eq!(topics.debug_out(), "debug/sensor/kitchen/out");
//! ```
//!
//! Strings are borrowed from the document, so they cannot contain JSON
//! escape sequences.

#![deny(unsafe_code)]

use core::fmt::Write as _;
use heapless::String;
use serde::Deserialize;

use crate::debug::DebugLevel;
use crate::network::{DEFAULT_BROKER_PORT, Options};
use crate::ota::{self, UpdateConfig};

/// Longest debug topic, in bytes.
pub const MAX_TOPIC_LEN: usize = 64;

/// Prefix of both debug topics.
pub const DEBUG_TOPIC_PREFIX: &str = "debug/sensor/";

/// Keep-alive announced to the broker.
pub const KEEP_ALIVE_SECONDS: u16 = 15;

/// Configuration errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The document is not a valid configuration.
    Parse,
    /// The name is too long to build the debug topics.
    NameTooLong,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Parse => defmt::write!(f, "Parse"),
            Error::NameTooLong => defmt::write!(f, "NameTooLong"),
        }
    }
}

/// Static configuration of a sensor node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig<'a> {
    /// Node name. Used as broker client id, update host name and in the debug
    /// topics.
    pub name: &'a str,
    /// Network to associate with.
    pub wifi_ssid: &'a str,
    /// Network passphrase.
    #[serde(default)]
    pub wifi_password: &'a str,
    /// Broker host name or address.
    pub broker_host: &'a str,
    /// Broker port.
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,
    /// Broker user name.
    #[serde(default)]
    pub broker_user: &'a str,
    /// Broker password.
    #[serde(default)]
    pub broker_password: &'a str,
    /// Port of the update listener.
    #[serde(default = "default_ota_port")]
    pub ota_port: u16,
    /// Password update hosts must present.
    #[serde(default)]
    pub ota_password: &'a str,
    /// Debug level in effect after boot.
    #[serde(default)]
    pub debug_level: DebugLevel,
}

fn default_broker_port() -> u16 {
    DEFAULT_BROKER_PORT
}

fn default_ota_port() -> u16 {
    ota::DEFAULT_PORT
}

impl<'a> DeviceConfig<'a> {
    /// Loads a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] if the document does not describe a configuration,
    /// [`Error::NameTooLong`] if the name does not fit in a debug topic.
    pub fn from_json(json: &'a [u8]) -> Result<Self, Error> {
        let (config, _) =
            serde_json_core::from_slice::<DeviceConfig<'a>>(json).map_err(|_| Error::Parse)?;
        Topics::for_device(config.name)?;
        Ok(config)
    }

    /// Options for opening the broker session.
    pub fn options(&self) -> Options<'a> {
        Options {
            host: self.broker_host,
            port: self.broker_port,
            client_id: self.name,
            username: self.broker_user,
            password: self.broker_password,
            keep_alive_seconds: KEEP_ALIVE_SECONDS,
        }
    }

    /// Configuration of the update listener.
    pub fn update_config(&self) -> UpdateConfig<'a> {
        UpdateConfig {
            port: self.ota_port,
            hostname: self.name,
            password: self.ota_password,
        }
    }
}

/// The two debug topics of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    control: String<MAX_TOPIC_LEN>,
    debug_out: String<MAX_TOPIC_LEN>,
}

impl Topics {
    /// Derives `debug/sensor/<name>/in` and `debug/sensor/<name>/out`.
    ///
    /// # Errors
    ///
    /// [`Error::NameTooLong`] if either topic exceeds [`MAX_TOPIC_LEN`].
    pub fn for_device(name: &str) -> Result<Self, Error> {
        let mut control = String::new();
        write!(control, "{}{}/in", DEBUG_TOPIC_PREFIX, name).map_err(|_| Error::NameTooLong)?;
        let mut debug_out = String::new();
        write!(debug_out, "{}{}/out", DEBUG_TOPIC_PREFIX, name)
            .map_err(|_| Error::NameTooLong)?;
        Ok(Self { control, debug_out })
    }

    /// Topic the node receives control messages on.
    pub fn control(&self) -> &str {
        &self.control
    }

    /// Topic debug lines are published to, retained.
    pub fn debug_out(&self) -> &str {
        &self.debug_out
    }
}
