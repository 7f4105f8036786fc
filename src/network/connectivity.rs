//! Association and broker-session management.
//!
//! Both resources are brought up by blocking retry loops. On a device the
//! loops never give up, since an unattended sensor has nothing better to do
//! than keep trying; hosted builds and tests can bound them with a
//! [`RetryPolicy`].

use core::fmt::Write as _;

use super::{Broker, Error, Options, Station};
use crate::system::Platform;

/// How often, and how many times, a connection step is retried.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay between two attempts.
    pub interval_ms: u32,
    /// Number of failed attempts after which the loop gives up. `None` retries
    /// forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever at a fixed interval.
    pub const fn forever(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` failed attempts.
    pub const fn bounded(interval_ms: u32, max_attempts: u32) -> Self {
        Self {
            interval_ms,
            max_attempts: Some(max_attempts),
        }
    }

    fn exhausted(&self, failures: u32) -> bool {
        matches!(self.max_attempts, Some(max) if failures >= max)
    }
}

/// Association polling used on devices: every 500 ms, forever.
pub const ASSOCIATION_RETRY: RetryPolicy = RetryPolicy::forever(500);

/// Broker reconnection used on devices: every 5 s, forever.
pub const SESSION_RETRY: RetryPolicy = RetryPolicy::forever(5_000);

/// State of the network association.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AssociationState {
    /// No association and none in progress.
    Unassociated,
    /// Association was started but has not completed.
    Associating,
    /// The station holds an association.
    Associated,
}

/// State of the broker session, derived from the broker handle.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SessionState {
    /// No live session.
    Disconnected,
    /// A live, authenticated session.
    Connected,
}

/// Owns the station and the broker session and keeps both up.
#[derive(Debug)]
pub struct ConnectivityManager<S: Station, B: Broker> {
    station: S,
    broker: B,
    association: AssociationState,
    association_retry: RetryPolicy,
    session_retry: RetryPolicy,
}

impl<S: Station, B: Broker> ConnectivityManager<S, B> {
    /// Creates a manager using the device retry policies.
    pub fn new(station: S, broker: B) -> Self {
        Self {
            station,
            broker,
            association: AssociationState::Unassociated,
            association_retry: ASSOCIATION_RETRY,
            session_retry: SESSION_RETRY,
        }
    }

    /// Replaces the retry policies.
    pub fn with_retry_policies(mut self, association: RetryPolicy, session: RetryPolicy) -> Self {
        self.association_retry = association;
        self.session_retry = session;
        self
    }

    /// Blocks until the station is associated.
    ///
    /// Returns immediately if it already is. Otherwise association is started
    /// and polled at the association interval, printing progress on the
    /// console. A station that refuses to start is asked again on the next
    /// poll.
    ///
    /// # Errors
    ///
    /// [`Error::RetriesExhausted`] if a bounded policy runs out.
    pub fn ensure_associated<P: Platform>(
        &mut self,
        platform: &mut P,
        ssid: &str,
        password: &str,
    ) -> Result<(), Error> {
        if self.station.is_associated() {
            self.association = AssociationState::Associated;
            return Ok(());
        }

        let _ = writeln!(platform);
        let _ = writeln!(platform, "Connecting to {}", ssid);

        self.association = AssociationState::Associating;
        let mut started = self.station.begin(ssid, password).is_ok();
        let mut polls = 0;

        while !self.station.is_associated() {
            if self.association_retry.exhausted(polls) {
                let _ = writeln!(platform);
                return Err(Error::RetriesExhausted);
            }
            platform.delay_ms(self.association_retry.interval_ms);
            let _ = write!(platform, ".");
            polls += 1;

            if !started {
                started = self.station.begin(ssid, password).is_ok();
            }
        }

        self.association = AssociationState::Associated;

        let _ = writeln!(platform);
        let _ = writeln!(platform, "WiFi connected");
        let _ = writeln!(platform, "IP address: ");
        match self.station.local_ip() {
            Some(ip) => {
                let _ = writeln!(platform, "{}", ip);
            }
            None => {
                let _ = writeln!(platform, "unknown");
            }
        }
        Ok(())
    }

    /// Blocks until an authenticated broker session exists and the control
    /// topic is subscribed on it.
    ///
    /// A session that is already live is left alone. Every new session
    /// subscribes to `control_topic` before this returns, so nothing can be
    /// routed from a session that lacks the subscription.
    ///
    /// # Errors
    ///
    /// [`Error::RetriesExhausted`] if a bounded policy runs out.
    pub fn ensure_connected<P: Platform>(
        &mut self,
        platform: &mut P,
        options: &Options<'_>,
        control_topic: &str,
    ) -> Result<(), Error> {
        if self.broker.is_connected() {
            return Ok(());
        }

        let mut failures = 0;
        loop {
            let _ = write!(platform, "Attempting MQTT connection...");

            match self.broker.connect(options) {
                Ok(()) => {
                    let _ = writeln!(platform, "connected");
                    match self.broker.subscribe(control_topic) {
                        Ok(()) => {
                            let _ = writeln!(platform, "Subscribed to {}", control_topic);
                            return Ok(());
                        }
                        Err(err) => {
                            let _ = writeln!(
                                platform,
                                "subscribe to {} failed: {:?}",
                                control_topic, err
                            );
                        }
                    }
                }
                Err(_) => {
                    let _ = writeln!(
                        platform,
                        "failed, rc={} try again in {} seconds",
                        self.broker.state(),
                        self.session_retry.interval_ms / 1000
                    );
                }
            }

            failures += 1;
            if self.session_retry.exhausted(failures) {
                return Err(Error::RetriesExhausted);
            }
            platform.delay_ms(self.session_retry.interval_ms);
        }
    }

    /// Whether the broker session is live. Never blocks.
    pub fn is_connected(&self) -> bool {
        self.broker.is_connected()
    }

    /// Current broker session state.
    pub fn session_state(&self) -> SessionState {
        if self.broker.is_connected() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Current association state.
    pub fn association_state(&self) -> AssociationState {
        match (self.station.is_associated(), self.association) {
            (true, _) => AssociationState::Associated,
            (false, AssociationState::Associating) => AssociationState::Associating,
            (false, _) => AssociationState::Unassociated,
        }
    }

    /// The station.
    pub fn station(&self) -> &S {
        &self.station
    }

    /// The broker session.
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// The broker session, mutably.
    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }
}
