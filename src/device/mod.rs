//! The device-specific half of a sensor node.
//!
//! The runtime calls into the device through this trait and nothing else. Both
//! hooks default to doing nothing, so a device only implements what it uses.

/// Sensing logic plugged into a [`SensorNode`](crate::system::SensorNode).
///
/// A device is shared by `&'static` reference between the main cycle and the
/// timer, which may run it from interrupt or thread context. Implementations
/// keep their state in atomics or critical-section cells, hence the `Sync`
/// bound.
pub trait Device: Sync {
    /// Periodic tick armed with
    /// [`SensorNode::register_timer`](crate::system::SensorNode::register_timer).
    ///
    /// Runs in interrupt-like context: must not block.
    fn on_timer(&self) {}

    /// A message arrived on a subscribed topic other than the control topic.
    ///
    /// `payload` is the raw payload as received.
    fn on_message(&self, topic: &str, payload: &[u8]) {
        let _ = (topic, payload);
    }
}

/// A device with no behaviour of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDevice;

impl Device for NoDevice {}
