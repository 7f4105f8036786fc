mod common;

use common::*;
use sensorbase::debug::{DebugLevel, DebugLevelCell, Log};
use sensorbase::router::{MessageRouter, Route};

/// Collects emitted lines, filtered by a shared level cell.
struct Lines<'a> {
    levels: &'a DebugLevelCell,
    lines: Vec<String>,
}

impl Log for Lines<'_> {
    fn level(&self) -> DebugLevel {
        self.levels.get()
    }

    fn emit(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}

struct Fixture {
    router: MessageRouter,
    levels: &'static DebugLevelCell,
    device: &'static RecordingDevice,
    lines: Lines<'static>,
}

impl Fixture {
    fn new(level: DebugLevel) -> Self {
        let levels: &'static DebugLevelCell = Box::leak(Box::new(DebugLevelCell::new(level)));
        Self {
            router: MessageRouter::new(CONTROL_TOPIC).unwrap(),
            levels,
            device: RecordingDevice::leak(),
            lines: Lines {
                levels,
                lines: Vec::new(),
            },
        }
    }

    fn route(&mut self, topic: &str, payload: &[u8]) -> Route {
        self.router
            .route(&mut self.lines, self.levels, self.device, topic, payload)
    }
}

#[test]
fn test_control_message_sets_level() {
    let mut f = Fixture::new(DebugLevel::Normal);

    let route = f.route(CONTROL_TOPIC, br#"{"debuglevel": 2}"#);

    assert_eq!(route, Route::Control(Some(DebugLevel::Information)));
    assert_eq!(f.levels.get(), DebugLevel::Information);
    assert!(f.device.messages().is_empty());
}

#[test]
fn test_control_level_may_be_a_numeric_string() {
    let mut f = Fixture::new(DebugLevel::Normal);
    assert_eq!(
        f.route(CONTROL_TOPIC, br#"{"debuglevel": "3"}"#),
        Route::Control(Some(DebugLevel::Verbose))
    );
    assert_eq!(f.levels.get(), DebugLevel::Verbose);
}

#[test]
fn test_control_level_is_clamped() {
    let mut f = Fixture::new(DebugLevel::Normal);

    assert_eq!(
        f.route(CONTROL_TOPIC, br#"{"debuglevel": 7}"#),
        Route::Control(Some(DebugLevel::Verbose))
    );
    assert_eq!(
        f.route(CONTROL_TOPIC, br#"{"debuglevel": -1}"#),
        Route::Control(Some(DebugLevel::None))
    );
    assert_eq!(f.levels.get(), DebugLevel::None);
}

#[test]
fn test_control_message_without_level_changes_nothing() {
    let mut f = Fixture::new(DebugLevel::Information);

    assert_eq!(f.route(CONTROL_TOPIC, br#"{"reboot": true}"#), Route::Control(None));
    assert_eq!(
        f.route(CONTROL_TOPIC, br#"{"debuglevel": "loud"}"#),
        Route::Control(None)
    );
    assert_eq!(f.levels.get(), DebugLevel::Information);
    assert!(f.device.messages().is_empty());
}

#[test]
fn test_other_topics_are_forwarded_raw_once() {
    let mut f = Fixture::new(DebugLevel::Normal);
    let payload = br#"{ "led" : true ,"debuglevel": 3 }"#;

    assert_eq!(f.route("home/kitchen/led", payload), Route::Forwarded);

    assert_eq!(
        f.device.messages(),
        [("home/kitchen/led".to_string(), payload.to_vec())]
    );
    // A debuglevel key outside the control topic is the device's business.
    assert_eq!(f.levels.get(), DebugLevel::Normal);
}

#[test]
fn test_malformed_payload_is_dropped_on_any_topic() {
    let mut f = Fixture::new(DebugLevel::Information);

    assert_eq!(f.route("home/kitchen/led", b"not json"), Route::Dropped);
    assert_eq!(f.route(CONTROL_TOPIC, b"{\"debuglevel\": 3"), Route::Dropped);
    assert_eq!(f.route("home/kitchen/led", b"[1, 2, 3]"), Route::Dropped);

    assert!(f.device.messages().is_empty());
    assert_eq!(f.levels.get(), DebugLevel::Information);
    assert_eq!(f.lines.lines.len(), 3);
    assert!(
        f.lines
            .lines
            .iter()
            .all(|line| line.starts_with("Fail to process json"))
    );
    assert!(f.lines.lines[0].ends_with("\n not json"));
}

#[test]
fn test_failure_log_respects_level() {
    let mut f = Fixture::new(DebugLevel::Normal);
    assert_eq!(f.route("home/kitchen/led", b"not json"), Route::Dropped);
    assert!(f.lines.lines.is_empty());
}

#[test]
fn test_verbose_traces_every_message() {
    let mut f = Fixture::new(DebugLevel::Verbose);

    f.route("home/kitchen/led", br#"{"on": 1}"#);
    f.route(CONTROL_TOPIC, br#"{"debuglevel": 1}"#);
    f.route("home/kitchen/led", br#"{"on": 0}"#);

    assert_eq!(
        f.lines.lines,
        [
            "Topic: [home/kitchen/led] \n Message: {\"on\": 1}",
            "Topic: [debug/sensor/kitchen/in] \n Message: {\"debuglevel\": 1}",
        ]
    );
}

#[test]
fn test_payload_after_terminator_is_ignored() {
    let mut f = Fixture::new(DebugLevel::Normal);
    let payload = b"{\"on\": 1}\0\xff\xfe";

    assert_eq!(f.route("home/kitchen/led", payload), Route::Forwarded);
    assert_eq!(f.device.messages()[0].1, payload.to_vec());
}

#[test]
fn test_message_with_many_readings_is_forwarded() {
    let mut f = Fixture::new(DebugLevel::Information);
    let readings: Vec<String> = (0..12).map(|i| format!("\"k{i}\":{i}")).collect();
    let payload = format!("{{{}}}", readings.join(","));

    assert_eq!(f.route("home/kitchen/sensors", payload.as_bytes()), Route::Forwarded);
    assert_eq!(f.device.messages().len(), 1);
    assert!(f.lines.lines.is_empty());
}

#[test]
fn test_kitchen_scenario() {
    let mut f = Fixture::new(DebugLevel::Normal);

    f.route(CONTROL_TOPIC, br#"{"debuglevel": 3}"#);
    f.route("home/kitchen/temp", br#"{"setpoint": 21.5}"#);
    f.route(CONTROL_TOPIC, br#"{"debuglevel": 0}"#);
    f.route("home/kitchen/temp", br#"{"setpoint": 19}"#);

    assert_eq!(f.device.messages().len(), 2);
    assert_eq!(f.levels.get(), DebugLevel::None);
    assert_eq!(
        f.lines.lines,
        [
            "Topic: [home/kitchen/temp] \n Message: {\"setpoint\": 21.5}",
            "Topic: [debug/sensor/kitchen/in] \n Message: {\"debuglevel\": 0}",
        ]
    );
}

#[test]
fn test_router_rejects_overlong_control_topic() {
    assert!(MessageRouter::new(&"t".repeat(65)).is_none());
    assert_eq!(
        MessageRouter::new(CONTROL_TOPIC).unwrap().control_topic(),
        CONTROL_TOPIC
    );
}
