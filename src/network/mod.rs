//! Connectivity layer for sensor nodes.
//!
//! The node talks to two external services: the wireless station that
//! associates with an access point, and the publish/subscribe broker that
//! carries the debug channel and the device topics. Both are traits here, so
//! the crate never implements radio drivers or wire framing itself; it only
//! decides when to call them and what to do when they fail.
//!
//! The [`connectivity`] module holds the retry loops built on these traits.

#![deny(unsafe_code)]

use core::net::Ipv4Addr;
use heapless::{String, Vec};

/// Common error types for connectivity operations
pub mod error;

/// Association and broker-session management
pub mod connectivity;

pub use connectivity::{AssociationState, ConnectivityManager, RetryPolicy, SessionState};
pub use error::Error;

/// Largest packet the broker session is expected to carry.
pub const MAX_PACKET_SIZE: usize = 512;

/// Longest topic accepted on an inbound packet.
pub const MAX_TOPIC_LEN: usize = 256;

/// Default broker port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// An inbound message delivered by the broker.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublishPacket {
    /// The topic the message was published on.
    pub topic: String<MAX_TOPIC_LEN>,
    /// The raw message payload.
    pub payload: Vec<u8, MAX_PACKET_SIZE>,
}

impl PublishPacket {
    /// Builds a packet from borrowed parts, failing if either exceeds its
    /// capacity.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        Some(Self {
            topic: String::try_from(topic).ok()?,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}

/// Options for opening a broker session.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// Broker host name or address.
    pub host: &'a str,
    /// Broker port.
    pub port: u16,
    /// The client identifier, unique per broker. Sensor nodes use their name.
    pub client_id: &'a str,
    /// User name presented to the broker.
    pub username: &'a str,
    /// Password presented to the broker.
    pub password: &'a str,
    /// The keep-alive time in seconds.
    pub keep_alive_seconds: u16,
}

/// A wireless station that associates with an access point.
///
/// `begin` starts association and may return before it completes; progress is
/// observed through [`Station::is_associated`].
pub trait Station {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Start associating with the given network
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error>;
    /// Whether the station currently holds an association
    fn is_associated(&self) -> bool;
    /// The address obtained on the network, once associated
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

/// A publish/subscribe broker session.
pub trait Broker {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open an authenticated session
    fn connect(&mut self, options: &Options<'_>) -> Result<(), Self::Error>;
    /// Cheap, non-blocking liveness check
    fn is_connected(&self) -> bool;
    /// Transport-specific state code, reported when connecting fails
    fn state(&self) -> i32;
    /// Subscribe to a topic filter
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;
    /// Publish a message, optionally retained by the broker
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;
    /// Service the session and return the next received message, if any
    fn poll(&mut self) -> Result<Option<PublishPacket>, Self::Error>;
}
