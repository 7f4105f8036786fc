use sensorbase::config::{DeviceConfig, Error, KEEP_ALIVE_SECONDS, Topics};
use sensorbase::debug::DebugLevel;

const FULL: &[u8] = br#"{
    "name": "garage",
    "wifi_ssid": "home",
    "wifi_password": "secret",
    "broker_host": "broker.local",
    "broker_port": 8883,
    "broker_user": "sensor",
    "broker_password": "hunter2",
    "ota_port": 3232,
    "ota_password": "ota-pass",
    "debug_level": 3
}"#;

#[test]
fn test_full_config() {
    let config = DeviceConfig::from_json(FULL).unwrap();

    assert_eq!(config.name, "garage");
    assert_eq!(config.wifi_ssid, "home");
    assert_eq!(config.wifi_password, "secret");
    assert_eq!(config.broker_host, "broker.local");
    assert_eq!(config.broker_port, 8883);
    assert_eq!(config.broker_user, "sensor");
    assert_eq!(config.broker_password, "hunter2");
    assert_eq!(config.ota_port, 3232);
    assert_eq!(config.ota_password, "ota-pass");
    assert_eq!(config.debug_level, DebugLevel::Verbose);
}

#[test]
fn test_defaults() {
    let config =
        DeviceConfig::from_json(br#"{"name": "attic", "wifi_ssid": "home", "broker_host": "10.0.0.2"}"#)
            .unwrap();

    assert_eq!(config.wifi_password, "");
    assert_eq!(config.broker_port, 1883);
    assert_eq!(config.broker_user, "");
    assert_eq!(config.ota_port, 8266);
    assert_eq!(config.ota_password, "");
    assert_eq!(config.debug_level, DebugLevel::Normal);
}

#[test]
fn test_out_of_range_level_is_clamped() {
    let config = DeviceConfig::from_json(
        br#"{"name": "a", "wifi_ssid": "b", "broker_host": "c", "debug_level": 9}"#,
    )
    .unwrap();
    assert_eq!(config.debug_level, DebugLevel::Verbose);
}

#[test]
fn test_invalid_documents() {
    assert_eq!(
        DeviceConfig::from_json(br#"{"wifi_ssid": "home", "broker_host": "c"}"#),
        Err(Error::Parse)
    );
    assert_eq!(DeviceConfig::from_json(b"not json"), Err(Error::Parse));
    assert_eq!(
        DeviceConfig::from_json(br#"{"name": 1, "wifi_ssid": "b", "broker_host": "c"}"#),
        Err(Error::Parse)
    );
}

#[test]
fn test_name_must_fit_topics() {
    let json = format!(
        r#"{{"name": "{}", "wifi_ssid": "b", "broker_host": "c"}}"#,
        "n".repeat(50)
    );
    assert_eq!(
        DeviceConfig::from_json(json.as_bytes()),
        Err(Error::NameTooLong)
    );
}

#[test]
fn test_derived_session_options() {
    let config = DeviceConfig::from_json(FULL).unwrap();

    let options = config.options();
    assert_eq!(options.host, "broker.local");
    assert_eq!(options.port, 8883);
    assert_eq!(options.client_id, "garage");
    assert_eq!(options.username, "sensor");
    assert_eq!(options.password, "hunter2");
    assert_eq!(options.keep_alive_seconds, KEEP_ALIVE_SECONDS);

    let update = config.update_config();
    assert_eq!(update.port, 3232);
    assert_eq!(update.hostname, "garage");
    assert_eq!(update.password, "ota-pass");
}

#[test]
fn test_topics() {
    let topics = Topics::for_device("garage").unwrap();
    assert_eq!(topics.control(), "debug/sensor/garage/in");
    assert_eq!(topics.debug_out(), "debug/sensor/garage/out");

    // 13 + 47 + 4 = 64
    assert!(Topics::for_device(&"n".repeat(47)).is_ok());
    assert_eq!(Topics::for_device(&"n".repeat(48)), Err(Error::NameTooLong));
}
