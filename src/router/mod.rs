//! Inbound message dispatch.
//!
//! Every message delivered by the broker goes through [`MessageRouter::route`]:
//! it is traced at [`DebugLevel::Verbose`], decoded, and then either applied
//! as a control command (on the node's control topic) or handed to the device.
//!
//! Control messages carry a `debuglevel` key:
//!
//! ```json
//! {"debuglevel": 3}
//! ```
//!
//! Values outside `0..=3` are clamped and numeric strings are accepted. A
//! control message without a usable `debuglevel` changes nothing.

#![deny(unsafe_code)]

use heapless::String;

use crate::codec::{DecodedMessage, Decoder, until_terminator};
use crate::debug::{DebugLevel, DebugLevelCell, Log};
use crate::device::Device;

/// Key of the debug level in a control message.
pub const DEBUG_LEVEL_KEY: &str = "debuglevel";

/// Longest control topic a router can hold.
pub const MAX_CONTROL_TOPIC_LEN: usize = 64;

/// What happened to a routed message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Route {
    /// The payload could not be decoded and was dropped.
    Dropped,
    /// The message arrived on the control topic. Carries the level that was
    /// applied, if any.
    Control(Option<DebugLevel>),
    /// The message was handed to the device.
    Forwarded,
}

/// Dispatches inbound messages.
#[derive(Debug)]
pub struct MessageRouter {
    control_topic: String<MAX_CONTROL_TOPIC_LEN>,
    decoder: Decoder,
}

impl MessageRouter {
    /// Creates a router treating `control_topic` as the control channel.
    ///
    /// Returns `None` if the topic does not fit.
    pub fn new(control_topic: &str) -> Option<Self> {
        Some(Self {
            control_topic: String::try_from(control_topic).ok()?,
            decoder: Decoder::new(),
        })
    }

    /// The control topic.
    pub fn control_topic(&self) -> &str {
        &self.control_topic
    }

    /// Routes one inbound message.
    ///
    /// Control messages update `levels` and are never seen by the device. Any
    /// other message that decodes is passed to [`Device::on_message`] exactly
    /// once, with the payload as received. Payloads that fail to decode are
    /// logged at [`DebugLevel::Information`] and dropped, whatever the topic.
    pub fn route<L, D>(
        &mut self,
        log: &mut L,
        levels: &DebugLevelCell,
        device: &D,
        topic: &str,
        payload: &[u8],
    ) -> Route
    where
        L: Log + ?Sized,
        D: Device + ?Sized,
    {
        let text = core::str::from_utf8(until_terminator(payload)).unwrap_or("<binary>");
        log.log_fmt(
            DebugLevel::Verbose,
            format_args!("Topic: [{}] \n Message: {}", topic, text),
        );

        let Some(message) = self.decoder.decode(log, payload) else {
            return Route::Dropped;
        };

        if topic == self.control_topic.as_str() {
            let level = requested_level(&message);
            if let Some(level) = level {
                levels.set(level);
            }
            Route::Control(level)
        } else {
            device.on_message(topic, payload);
            Route::Forwarded
        }
    }
}

fn requested_level(message: &DecodedMessage<'_>) -> Option<DebugLevel> {
    message
        .get(DEBUG_LEVEL_KEY)
        .and_then(|value| value.as_i64())
        .map(DebugLevel::from_raw)
}
