mod common;

use common::*;
use sensorbase::device::{Device, NoDevice};
use sensorbase::timer::{Error, TimerService};

static IDLE: NoDevice = NoDevice;

#[test]
fn test_zero_period_is_rejected() {
    let mut service = TimerService::new(MockTimer::default());
    assert_eq!(service.register(0, &IDLE), Err(Error::InvalidPeriod));
    assert!(!service.is_armed());
    assert!(service.timer().slot.lock().unwrap().is_none());
}

#[test]
fn test_timer_is_armed_once() {
    let device = RecordingDevice::leak();
    let mut service = TimerService::new(MockTimer::default());

    service.register(250, device).unwrap();
    assert_eq!(service.period_ms(), Some(250));

    assert_eq!(service.register(100, device), Err(Error::AlreadyArmed));
    assert_eq!(service.period_ms(), Some(250));

    fire(&service.timer().slot);
    assert_eq!(device.ticks(), 1);
}

#[test]
fn test_hardware_refusal_leaves_timer_unarmed() {
    let timer = MockTimer {
        refuse: true,
        ..MockTimer::default()
    };
    let mut service = TimerService::new(timer);

    assert_eq!(service.register(1_000, &IDLE), Err(Error::Hardware));
    assert!(!service.is_armed());
}

#[test]
fn test_default_hooks_do_nothing() {
    IDLE.on_timer();
    IDLE.on_message("any/topic", b"{}");
}
