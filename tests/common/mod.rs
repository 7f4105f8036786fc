//! Mock platform services shared by the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use sensorbase::config::DeviceConfig;
use sensorbase::debug::DebugLevel;
use sensorbase::device::Device;
use sensorbase::network::{Broker, Options, PublishPacket, RetryPolicy, Station};
use sensorbase::ota::{self, Event, UpdateConfig, UpdateService};
use sensorbase::system::{Parts, Platform, SensorNode};
use sensorbase::timer::HardwareTimer;

pub const CONTROL_TOPIC: &str = "debug/sensor/kitchen/in";
pub const DEBUG_TOPIC: &str = "debug/sensor/kitchen/out";

pub const CONFIG: DeviceConfig<'static> = DeviceConfig {
    name: "kitchen",
    wifi_ssid: "home",
    wifi_password: "secret",
    broker_host: "10.0.0.2",
    broker_port: 1883,
    broker_user: "sensor",
    broker_password: "hunter2",
    ota_port: 8266,
    ota_password: "ota-pass",
    debug_level: DebugLevel::Normal,
};

#[derive(Debug)]
pub struct MockError;

// -------------------------
// Platform
// -------------------------

#[derive(Debug, Default)]
pub struct MockPlatform {
    pub console: String,
    pub console_ready: bool,
    pub delays: Vec<u32>,
    pub restarts: u32,
}

impl core::fmt::Write for MockPlatform {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.console.push_str(s);
        Ok(())
    }
}

impl Platform for MockPlatform {
    fn init_console(&mut self) {
        self.console_ready = true;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }

    fn restart(&mut self) {
        self.restarts += 1;
    }
}

// -------------------------
// Station
// -------------------------

/// Associates `pending_polls` status checks after a successful `begin`.
#[derive(Debug, Default)]
pub struct MockStation {
    pub pending_polls: Cell<u32>,
    pub fail_begins: u32,
    pub begin_calls: u32,
    pub started: bool,
    pub never: bool,
}

impl MockStation {
    pub fn after(polls: u32) -> Self {
        Self {
            pending_polls: Cell::new(polls),
            ..Self::default()
        }
    }

    pub fn associated() -> Self {
        Self {
            started: true,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            never: true,
            ..Self::default()
        }
    }
}

impl Station for MockStation {
    type Error = MockError;

    fn begin(&mut self, _ssid: &str, _password: &str) -> Result<(), Self::Error> {
        self.begin_calls += 1;
        if self.begin_calls <= self.fail_begins {
            return Err(MockError);
        }
        self.started = true;
        Ok(())
    }

    fn is_associated(&self) -> bool {
        if !self.started || self.never {
            return false;
        }
        match self.pending_polls.get() {
            0 => true,
            n => {
                self.pending_polls.set(n - 1);
                false
            }
        }
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        (self.started && !self.never && self.pending_polls.get() == 0)
            .then(|| Ipv4Addr::new(192, 168, 1, 50))
    }
}

// -------------------------
// Broker
// -------------------------

#[derive(Debug, Default)]
pub struct MockBroker {
    pub connected: bool,
    pub fail_connects: u32,
    pub fail_subscribes: u32,
    pub fail_publish: bool,
    pub connect_calls: u32,
    pub poll_calls: u32,
    pub last_client_id: Option<String>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>, bool)>,
    pub inbox: VecDeque<PublishPacket>,
    pub events: Vec<String>,
}

impl MockBroker {
    pub fn online() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        self.inbox
            .push_back(PublishPacket::new(topic, payload).expect("packet fits"));
    }

    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, payload, _)| String::from_utf8(payload.clone()).unwrap())
            .collect()
    }
}

impl Broker for MockBroker {
    type Error = MockError;

    fn connect(&mut self, options: &Options<'_>) -> Result<(), Self::Error> {
        self.connect_calls += 1;
        self.events.push("connect".into());
        self.last_client_id = Some(options.client_id.into());
        if self.connect_calls <= self.fail_connects {
            return Err(MockError);
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn state(&self) -> i32 {
        if self.connected { 0 } else { -2 }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.events.push(format!("subscribe:{topic}"));
        if self.fail_subscribes > 0 {
            self.fail_subscribes -= 1;
            return Err(MockError);
        }
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        if !self.connected || self.fail_publish {
            return Err(MockError);
        }
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<PublishPacket>, Self::Error> {
        self.poll_calls += 1;
        if !self.connected {
            return Err(MockError);
        }
        Ok(self.inbox.pop_front())
    }
}

// -------------------------
// Update listener
// -------------------------

#[derive(Debug, Default)]
pub struct MockUpdater {
    pub started_with: Option<(u16, String, String)>,
    pub fail_begin: Option<ota::Error>,
    pub events: VecDeque<Event>,
}

impl UpdateService for MockUpdater {
    fn begin(&mut self, config: &UpdateConfig<'_>) -> Result<(), ota::Error> {
        if let Some(err) = self.fail_begin {
            return Err(err);
        }
        self.started_with = Some((config.port, config.hostname.into(), config.password.into()));
        Ok(())
    }

    fn poll(&mut self) -> Option<Event> {
        self.events.pop_front()
    }
}

// -------------------------
// Timer
// -------------------------

pub type TimerSlot = Arc<Mutex<Option<(u32, &'static dyn Device)>>>;

/// Records the armed hook so tests can fire it by hand.
#[derive(Default)]
pub struct MockTimer {
    pub slot: TimerSlot,
    pub refuse: bool,
}

impl HardwareTimer for MockTimer {
    type Error = MockError;

    fn arm(&mut self, period_ms: u32, hook: &'static dyn Device) -> Result<(), Self::Error> {
        if self.refuse {
            return Err(MockError);
        }
        *self.slot.lock().unwrap() = Some((period_ms, hook));
        Ok(())
    }
}

pub fn fire(slot: &TimerSlot) {
    let armed = *slot.lock().unwrap();
    if let Some((_, hook)) = armed {
        hook.on_timer();
    }
}

// -------------------------
// Device
// -------------------------

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub ticks: AtomicU32,
    pub messages: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingDevice {
    pub fn leak() -> &'static Self {
        Box::leak(Box::default())
    }

    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Device for RecordingDevice {
    fn on_timer(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        self.messages
            .lock()
            .unwrap()
            .push((topic.into(), payload.to_vec()));
    }
}

// -------------------------
// Node
// -------------------------

pub type TestNode = SensorNode<
    'static,
    MockPlatform,
    MockStation,
    MockBroker,
    MockUpdater,
    MockTimer,
    RecordingDevice,
>;

pub struct Harness {
    pub node: TestNode,
    pub device: &'static RecordingDevice,
    pub timer: TimerSlot,
}

pub fn harness(
    config: DeviceConfig<'static>,
    station: MockStation,
    broker: MockBroker,
    updater: MockUpdater,
) -> Harness {
    let device = RecordingDevice::leak();
    let timer = MockTimer::default();
    let slot = timer.slot.clone();
    let parts = Parts {
        platform: MockPlatform::default(),
        station,
        broker,
        updater,
        timer,
    };
    let node = SensorNode::new(config, parts, device)
        .unwrap()
        .with_retry_policies(RetryPolicy::bounded(500, 20), RetryPolicy::bounded(5_000, 5));
    Harness {
        node,
        device,
        timer: slot,
    }
}

/// A node whose setup succeeds at once.
pub fn online_node() -> Harness {
    let mut h = harness(
        CONFIG,
        MockStation::associated(),
        MockBroker::default(),
        MockUpdater::default(),
    );
    h.node.setup().unwrap();
    h
}

pub fn broker(node: &mut TestNode) -> &mut MockBroker {
    node.connectivity_mut().broker_mut()
}
