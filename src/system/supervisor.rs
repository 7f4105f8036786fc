//! Lifecycle supervisor.
//!
//! # Architecture
//!
//! ```text
//!              setup()                          run_cycle()
//!   ┌──────────────────────────┐      ┌─────────────────────────────┐
//!   │ console                  │      │ broker session alive?       │
//!   │ association  (blocking)  │      │   no  -> "Resetting..."     │
//!   │ update listener          │ ───▶ │          Platform::restart  │
//!   │ broker + control topic   │      │   yes -> drain broker       │
//!   │ "SensorBase SETUP DONE!" │      │          -> MessageRouter   │
//!   └──────────────────────────┘      │          poll updates       │
//!                                     └─────────────────────────────┘
//! ```
//!
//! Losing the broker session is never repaired in place: the node restarts
//! and goes through setup again. Association and the first broker connection
//! are retried inside `setup` until they succeed.

#![deny(unsafe_code)]

use core::fmt::{self, Write as _};

use crate::config::{self, DeviceConfig, Topics};
use crate::debug::{DebugLevel, DebugLevelCell, DebugSink, Log};
use crate::device::Device;
use crate::network::{self, Broker, ConnectivityManager, RetryPolicy, Station};
use crate::ota::{self, UpdateService, UpdateState};
use crate::router::{MessageRouter, Route};
use crate::timer::{self, HardwareTimer, TimerService};

use super::Platform;

/// Outcome of one main-cycle iteration.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Health {
    /// The broker session is up and was serviced.
    Healthy,
    /// The broker session was down and a restart was requested.
    Restarting,
}

/// The platform services a node is built from.
#[derive(Debug)]
pub struct Parts<P, S, B, U, T> {
    /// Console, delays and reset.
    pub platform: P,
    /// Network station.
    pub station: S,
    /// Broker session.
    pub broker: B,
    /// Update listener.
    pub updater: U,
    /// Hardware timer.
    pub timer: T,
}

/// A sensor node: the runtime around a [`Device`].
pub struct SensorNode<'a, P, S, B, U, T, D>
where
    P: Platform,
    S: Station,
    B: Broker,
    U: UpdateService,
    T: HardwareTimer,
    D: Device + 'static,
{
    config: DeviceConfig<'a>,
    topics: Topics,
    platform: P,
    connectivity: ConnectivityManager<S, B>,
    updater: U,
    update_state: UpdateState,
    timer: TimerService<T>,
    router: MessageRouter,
    levels: DebugLevelCell,
    device: &'static D,
}

impl<'a, P, S, B, U, T, D> SensorNode<'a, P, S, B, U, T, D>
where
    P: Platform,
    S: Station,
    B: Broker,
    U: UpdateService,
    T: HardwareTimer,
    D: Device + 'static,
{
    /// Assembles a node. Nothing is started until [`SensorNode::setup`].
    ///
    /// # Errors
    ///
    /// [`config::Error::NameTooLong`] if the device name does not fit in the
    /// debug topics.
    pub fn new(
        config: DeviceConfig<'a>,
        parts: Parts<P, S, B, U, T>,
        device: &'static D,
    ) -> Result<Self, config::Error> {
        let topics = Topics::for_device(config.name)?;
        let router = MessageRouter::new(topics.control()).ok_or(config::Error::NameTooLong)?;

        Ok(Self {
            config,
            platform: parts.platform,
            connectivity: ConnectivityManager::new(parts.station, parts.broker),
            updater: parts.updater,
            update_state: UpdateState::Idle,
            timer: TimerService::new(parts.timer),
            router,
            levels: DebugLevelCell::new(config.debug_level),
            topics,
            device,
        })
    }

    /// Replaces the association and broker retry policies.
    pub fn with_retry_policies(mut self, association: RetryPolicy, session: RetryPolicy) -> Self {
        self.connectivity = self.connectivity.with_retry_policies(association, session);
        self
    }

    /// Brings the node up: console, association, update listener, broker
    /// session with the control subscription, in that order.
    ///
    /// An update listener that fails to start is reported on the console and
    /// otherwise ignored.
    ///
    /// # Errors
    ///
    /// [`network::Error::RetriesExhausted`] if a bounded retry policy runs
    /// out. With the default policies this blocks until both connections are
    /// up.
    pub fn setup(&mut self) -> Result<(), network::Error> {
        self.platform.init_console();
        let _ = writeln!(self.platform);
        let _ = writeln!(self.platform, "Serial logging successfully setup");

        self.connectivity.ensure_associated(
            &mut self.platform,
            self.config.wifi_ssid,
            self.config.wifi_password,
        )?;

        self.setup_updates();

        let options = self.config.options();
        self.connectivity
            .ensure_connected(&mut self.platform, &options, self.topics.control())?;

        self.log(DebugLevel::Information, "SensorBase SETUP DONE!");
        Ok(())
    }

    fn setup_updates(&mut self) {
        let _ = writeln!(self.platform, "OTA is setup");
        match self.updater.begin(&self.config.update_config()) {
            Ok(()) => {
                let _ = writeln!(self.platform, "OTA successfully setup");
            }
            Err(err) => {
                let _ = ota::report(&mut self.platform, ota::Event::Error(err));
            }
        }
    }

    /// Runs one iteration of the main cycle.
    ///
    /// If the broker session is gone the node restarts. Otherwise every
    /// message the broker has buffered is routed, then the update listener is
    /// serviced.
    pub fn run_cycle(&mut self) -> Health {
        if !self.connectivity.is_connected() {
            #[cfg(feature = "defmt")]
            defmt::warn!("broker session lost, restarting");
            let _ = write!(self.platform, "Resetting...");
            self.platform.restart();
            return Health::Restarting;
        }

        self.service_broker();
        self.service_updates();
        Health::Healthy
    }

    /// Runs the main cycle forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.run_cycle();
        }
    }

    fn service_broker(&mut self) {
        loop {
            let packet = match self.connectivity.broker_mut().poll() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(_err) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("broker poll failed: {}", defmt::Debug2Format(&_err));
                    break;
                }
            };
            self.dispatch(&packet.topic, &packet.payload);
        }
    }

    /// Routes one inbound message as if the broker had delivered it.
    pub fn dispatch(&mut self, topic: &str, payload: &[u8]) -> Route {
        let mut sink = DebugSink::new(
            &self.levels,
            self.topics.debug_out(),
            &mut self.platform,
            self.connectivity.broker_mut(),
        );
        self.router.route(&mut sink, &self.levels, self.device, topic, payload)
    }

    fn service_updates(&mut self) {
        while let Some(event) = self.updater.poll() {
            self.update_state = self.update_state.next(event);
            let _ = ota::report(&mut self.platform, event);
        }
    }

    /// Arms the periodic timer calling [`Device::on_timer`].
    ///
    /// # Errors
    ///
    /// See [`TimerService::register`].
    pub fn register_timer(&mut self, period_ms: u32) -> Result<(), timer::Error> {
        self.timer.register(period_ms, self.device)
    }

    /// Logs `message` at [`DebugLevel::Normal`].
    pub fn debug_print(&mut self, message: &str) {
        self.print(message);
    }

    /// Formats and logs a line at `level`. See also
    /// [`debug_printf!`](crate::debug_printf).
    pub fn debug_printf(&mut self, level: DebugLevel, args: fmt::Arguments<'_>) {
        self.log_fmt(level, args);
    }

    /// Replaces the debug level.
    pub fn set_debug_level(&self, level: DebugLevel) {
        self.levels.set(level);
    }

    /// The current debug level.
    pub fn debug_level(&self) -> DebugLevel {
        self.levels.get()
    }

    /// Publishes on behalf of the device.
    ///
    /// # Errors
    ///
    /// [`network::Error::NotConnected`] without a broker session,
    /// [`network::Error::PublishFailed`] if the broker rejects the message.
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), network::Error> {
        if !self.connectivity.is_connected() {
            return Err(network::Error::NotConnected);
        }
        self.connectivity
            .broker_mut()
            .publish(topic, payload, retain)
            .map_err(|_| network::Error::PublishFailed)
    }

    /// The node's debug topics.
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// The node's configuration.
    pub fn config(&self) -> &DeviceConfig<'a> {
        &self.config
    }

    /// Where the last firmware update stands.
    pub fn update_state(&self) -> UpdateState {
        self.update_state
    }

    /// Whether the periodic timer is armed.
    pub fn timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// The platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The platform, mutably.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// The connectivity manager.
    pub fn connectivity(&self) -> &ConnectivityManager<S, B> {
        &self.connectivity
    }

    /// The connectivity manager, mutably.
    pub fn connectivity_mut(&mut self) -> &mut ConnectivityManager<S, B> {
        &mut self.connectivity
    }

    /// The update listener.
    pub fn updater(&self) -> &U {
        &self.updater
    }
}

impl<P, S, B, U, T, D> Log for SensorNode<'_, P, S, B, U, T, D>
where
    P: Platform,
    S: Station,
    B: Broker,
    U: UpdateService,
    T: HardwareTimer,
    D: Device + 'static,
{
    fn level(&self) -> DebugLevel {
        self.levels.get()
    }

    fn emit(&mut self, message: &str) {
        DebugSink::new(
            &self.levels,
            self.topics.debug_out(),
            &mut self.platform,
            self.connectivity.broker_mut(),
        )
        .emit(message);
    }
}

impl<P, S, B, U, T, D> fmt::Debug for SensorNode<'_, P, S, B, U, T, D>
where
    P: Platform,
    S: Station,
    B: Broker,
    U: UpdateService,
    T: HardwareTimer,
    D: Device + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorNode")
            .field("name", &self.config.name)
            .field("debug_level", &self.levels.get())
            .field("session", &self.connectivity.session_state())
            .field("update_state", &self.update_state)
            .finish_non_exhaustive()
    }
}
