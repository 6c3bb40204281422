//! Display Tests
//!
//! Full client runs: device frames in, display values out.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;

use mgk_timer_client::application::services::DisconnectReason;
use mgk_timer_client::domain::{Command, StatusKind};
use mgk_timer_client::startup::Application;

use crate::common::{test_settings, FakeDevice, Observed, RecordingObserver};

#[tokio::test(start_paused = true)]
async fn test_live_run_then_device_duration() {
    let device = FakeDevice::responsive();
    let app = Application::with_parts(
        device.connector(),
        RecordingObserver::new(),
        &test_settings(),
    );

    let script = async {
        sleep(Duration::from_millis(10)).await;
        device.push_text(r#"{"msg":"ready"}"#);
        sleep(Duration::from_millis(10)).await;
        device.push_text(r#"{"msg":"running","start":0}"#);
        sleep(Duration::from_millis(450)).await;
        device.push_text(r#"{"msg":"finish","start":0,"finish":1234000}"#);
        sleep(Duration::from_millis(500)).await;
    };
    let observer = app.run_until(script).await.unwrap();

    assert_eq!(
        observer.observed(),
        vec![
            Observed::Connected,
            Observed::Status(StatusKind::Ready),
            Observed::Status(StatusKind::Running),
            Observed::Tick("00:00:00:10".into(), 100_000),
            Observed::Tick("00:00:00:20".into(), 200_000),
            Observed::Tick("00:00:00:30".into(), 300_000),
            Observed::Tick("00:00:00:40".into(), 400_000),
            Observed::Status(StatusKind::Finish),
            Observed::Tick("00:00:01:23".into(), 1_234_000),
            Observed::Disconnected(DisconnectReason::Shutdown),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_finish_value_comes_from_device_timestamps() {
    let device = FakeDevice::responsive();
    let observer = RecordingObserver::new();
    let app = Application::with_parts(device.connector(), observer.clone(), &test_settings());

    let script = async {
        sleep(Duration::from_millis(10)).await;
        device.push_text(r#"{"msg":"Timer running","start":1000000}"#);
        // Locally far longer than the device measured
        sleep(Duration::from_millis(5_050)).await;
        device.push_text(r#"{"msg":"Finish","start":1000000,"finish":4500000}"#);
        sleep(Duration::from_secs(2)).await;
    };
    app.run_until(script).await.unwrap();

    let ticks = observer.ticks();
    assert_eq!(ticks.len(), 51);
    assert_eq!(ticks[49], ("00:00:05:00".to_string(), 5_000_000));
    assert_eq!(ticks[50], ("00:00:03:50".to_string(), 3_500_000));
}

#[tokio::test(start_paused = true)]
async fn test_ready_stops_the_display_and_holds_its_value() {
    let device = FakeDevice::responsive();
    let observer = RecordingObserver::new();
    let app = Application::with_parts(device.connector(), observer.clone(), &test_settings());

    let script = async {
        sleep(Duration::from_millis(10)).await;
        device.push_text(r#"{"msg":"running"}"#);
        sleep(Duration::from_millis(250)).await;
        device.push_text(r#"{"msg":"ready"}"#);
        sleep(Duration::from_secs(3)).await;
    };
    app.run_until(script).await.unwrap();

    assert_eq!(
        observer.ticks(),
        vec![
            ("00:00:00:10".to_string(), 100_000),
            ("00:00:00:20".to_string(), 200_000),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_display_keeps_ticking_across_a_reconnect() {
    let device = FakeDevice::responsive();
    let observer = RecordingObserver::new();
    let app = Application::with_parts(device.connector(), observer.clone(), &test_settings());

    let script = async {
        sleep(Duration::from_millis(10)).await;
        device.push_text(r#"{"msg":"running"}"#);
        sleep(Duration::from_millis(300)).await;
        device.close_from_device();
        sleep(Duration::from_millis(2_500)).await;
        device.push_text(r#"{"msg":"finish","start":0,"finish":2800000}"#);
        sleep(Duration::from_millis(100)).await;
    };
    app.run_until(script).await.unwrap();

    let observed = observer.observed();
    let disconnected = observed
        .iter()
        .position(|entry| *entry == Observed::Disconnected(DisconnectReason::ClosedByRemote))
        .unwrap();
    let reconnected = observed
        .iter()
        .rposition(|entry| *entry == Observed::Connected)
        .unwrap();
    assert!(reconnected > disconnected);
    assert!(observed[disconnected..reconnected]
        .iter()
        .any(|entry| matches!(entry, Observed::Tick(..))));
    assert_eq!(
        observer.ticks().last().unwrap(),
        &("00:00:02:80".to_string(), 2_800_000)
    );
}

#[tokio::test(start_paused = true)]
async fn test_commands_before_connect_are_reported_dropped() {
    let device = FakeDevice::responsive();
    let observer = RecordingObserver::new();
    let app = Application::with_parts(device.connector(), observer.clone(), &test_settings());
    let handle = app.handle().clone();

    let script = async {
        sleep(Duration::from_millis(10)).await;
        device.close_from_device();
        sleep(Duration::from_millis(10)).await;
        handle.send_command(Command::Intensity(9)).unwrap();
        sleep(Duration::from_secs(3)).await;
        handle.send_command(Command::Intensity(10)).unwrap();
        sleep(Duration::from_millis(10)).await;
    };
    app.run_until(script).await.unwrap();

    assert!(observer
        .observed()
        .contains(&Observed::Dropped(Command::Intensity(9))));
    assert_eq!(device.sent_commands(), vec![r#"{"intensity":10}"#.to_string()]);
}
