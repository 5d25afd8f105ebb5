//! Sampling driven by the tick loop and the RTC.

use sensornode::app::events::AppEvent;
use sensornode::app::ports::SensorReading;

use crate::mock_hw::Rig;

const ARM_10S: &str =
    r#"{"command":"setting","latest_time":"2025-01-01 00:00:00","period":"00:00:10"}"#;

fn armed_rig() -> Rig {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, ARM_10S);
    rig
}

#[test]
fn nothing_is_logged_before_a_command() {
    let mut rig = Rig::new();
    rig.advance(3600 * 24);
    rig.tick();
    assert!(rig.log_lines().is_empty());
    assert_eq!(rig.svc.sensor_mut().samples, 0);
}

#[test]
fn logs_once_per_period() {
    let mut rig = armed_rig();
    // First record on the arming tick, at the origin.
    assert_eq!(rig.log_lines(), vec!["2025-01-01T00:00:00,21.5,40.25,30"]);

    rig.advance(10);
    rig.tick();
    rig.advance(10);
    rig.tick();
    assert_eq!(rig.log_lines().len(), 3);

    // Half a period later: nothing.
    rig.advance(5);
    rig.tick();
    assert_eq!(rig.log_lines().len(), 3);

    assert_eq!(
        rig.log_lines()[2],
        "2025-01-01T00:00:20,21.5,40.25,30"
    );
}

#[test]
fn repeated_ticks_in_one_second_log_once() {
    let mut rig = armed_rig();
    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.log_lines().len(), 1);
}

#[test]
fn cold_boot_clock_starts_at_origin() {
    let mut rig = Rig::new();
    rig.svc.clock_mut().now = sensornode::timefmt::parse_timestamp("1970-01-01 00:00:00").unwrap();
    rig.connect(1);
    rig.send(1, r#"{"command":"setting","period":"00:00:10"}"#);
    // No time in the command: the RTC is loaded from the default origin.
    assert_eq!(rig.log_lines(), vec!["2025-01-01T00:00:00,21.5,40.25,30"]);

    rig.advance(10);
    rig.tick();
    assert_eq!(rig.log_lines().len(), 2);
}

#[test]
fn rearm_in_same_second_does_not_duplicate() {
    let mut rig = armed_rig();
    rig.send(1, r#"{"command":"setting","period":"10"}"#);
    assert_eq!(rig.log_lines().len(), 1);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::ScheduleArmed { .. })),
        2
    );
}

#[test]
fn clock_stepped_back_rebaselines() {
    let mut rig = armed_rig();
    rig.advance(60);
    rig.tick();
    assert_eq!(rig.log_lines().len(), 2);

    rig.send(
        1,
        r#"{"command":"setting","latest_time":"2025-01-01 00:00:30","period":"10"}"#,
    );
    assert_eq!(rig.log_lines().len(), 3);
    assert_eq!(rig.log_lines()[2], "2025-01-01T00:00:30,21.5,40.25,30");

    rig.advance(10);
    rig.tick();
    assert_eq!(rig.log_lines().len(), 4);
}

#[test]
fn failed_reads_are_empty_fields() {
    let mut rig = Rig::new();
    rig.svc.sensor_mut().reading = SensorReading {
        temperature: None,
        humidity: Some(55.5),
        cpu_temperature: None,
    };
    rig.connect(1);
    rig.send(1, ARM_10S);
    assert_eq!(rig.log_lines(), vec!["2025-01-01T00:00:00,,55.5,"]);
}

#[test]
fn period_change_applies_from_last_record() {
    let mut rig = armed_rig();
    rig.send(1, r#"{"command":"setting","period":"00:01:00"}"#);
    rig.advance(30);
    rig.tick();
    assert_eq!(rig.log_lines().len(), 1);
    rig.advance(30);
    rig.tick();
    assert_eq!(rig.log_lines().len(), 2);
}

#[test]
fn sampling_resumes_after_transfer() {
    let mut rig = armed_rig();
    rig.advance(10);
    rig.tick();
    rig.send(1, r#"{"command":"update"}"#);
    assert!(rig.log_lines().is_empty());

    rig.advance(10);
    rig.tick();
    assert_eq!(rig.log_lines(), vec!["2025-01-01T00:00:20,21.5,40.25,30"]);
}
