//! Command handling through the full service: radio event in, response out.

use sensornode::app::commands::CommandKind;
use sensornode::app::events::AppEvent;
use sensornode::config::{FramingMode, NodeConfig};
use sensornode::protocol::framing::encode_length_prefixed;
use sensornode::timefmt;

use crate::mock_hw::{MemFile, MemNames, Rig};

// ── Startup ──────────────────────────────────────────────────

#[test]
fn start_publishes_default_identity_and_advertises() {
    let rig = Rig::new();
    assert_eq!(rig.radio().identity.as_deref(), Some("MedMCAFE"));
    assert_eq!(rig.radio().adverts, 1);
    assert_eq!(rig.svc.settings().name, "MedMCAFE");
    assert_eq!(
        rig.sink.events,
        vec![AppEvent::Started {
            name: "MedMCAFE".into()
        }]
    );
    // Fresh log has its header and no data.
    assert_eq!(rig.svc.store().file().text.as_deref(), Some("time,tp,hd,cputp\n"));
}

#[test]
fn persisted_name_wins_over_default() {
    let names = MemNames {
        stored: Some("Greenhouse".into()),
    };
    let rig = Rig::with(NodeConfig::default(), MemFile::default(), names);
    assert_eq!(rig.svc.settings().name, "Greenhouse");
    assert_eq!(rig.radio().identity.as_deref(), Some("Greenhouse"));
}

#[test]
fn invalid_persisted_name_falls_back_to_default() {
    let names = MemNames {
        stored: Some("x".repeat(40)),
    };
    let rig = Rig::with(NodeConfig::default(), MemFile::default(), names);
    assert_eq!(rig.svc.settings().name, "MedMCAFE");
}

// ── Setting ──────────────────────────────────────────────────

#[test]
fn setting_echoes_values_and_sets_clock() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(
        1,
        r#"{"command":"setting","latest_time":"2025-03-01 08:00:00","period":"0:5:0"}"#,
    );

    let reply = rig.radio().last_to(1).unwrap();
    assert_eq!(reply["status"], "success");
    assert_eq!(reply["message"], "Settings update");
    assert_eq!(reply["data"]["latest_time"], "2025-03-01 08:00:00");
    assert_eq!(reply["data"]["period"], "00:05:00");
    assert_eq!(reply["data"]["name"], "MedMCAFE");

    assert_eq!(rig.svc.clock().sets.len(), 1);
    assert_eq!(rig.svc.settings().period.as_secs(), 300);
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::CommandAccepted(CommandKind::Setting)));
}

#[test]
fn setting_without_time_loads_lagging_rtc_from_origin() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, r#"{"command":"setting","latest_time":null,"period":"30"}"#);
    // RTC was in 2024, behind the default origin.
    assert_eq!(
        rig.svc.clock().sets,
        vec![timefmt::parse_timestamp("2025-01-01 00:00:00").unwrap()]
    );
    assert_eq!(rig.svc.settings().period.as_secs(), 30);
    assert_eq!(
        rig.radio().last_to(1).unwrap()["data"]["latest_time"],
        "2025-01-01 00:00:00"
    );
    assert_eq!(rig.log_lines(), vec!["2025-01-01T00:00:00,21.5,40.25,30"]);
}

#[test]
fn setting_without_time_leaves_current_rtc_alone() {
    let mut rig = Rig::new();
    rig.advance(3600);
    rig.connect(1);
    rig.send(1, r#"{"command":"setting","period":"30"}"#);
    assert!(rig.svc.clock().sets.is_empty());
    assert_eq!(rig.log_lines(), vec!["2025-01-01T00:59:00,21.5,40.25,30"]);
}

#[test]
fn fragmented_write_yields_one_response() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.events.write(1, br#"{"command":"sett"#);
    rig.events.write(1, br#"ing","period":"#);
    rig.events.write(1, br#""10"}"#);
    rig.tick();
    assert_eq!(rig.radio().messages_to(1).len(), 1);
    assert_eq!(rig.svc.settings().period.as_secs(), 10);
}

#[test]
fn partial_write_waits_for_the_rest() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, r#"{"command":"setting","#);
    assert!(rig.radio().sent.is_empty());
    rig.send(1, r#""period":"10"}"#);
    assert_eq!(rig.radio().messages_to(1).len(), 1);
}

#[test]
fn length_prefixed_framing_is_honored() {
    let config = NodeConfig {
        framing: FramingMode::LengthPrefixed,
        ..NodeConfig::default()
    };
    let mut rig = Rig::with(config, MemFile::default(), MemNames::default());
    rig.connect(1);
    let frame = encode_length_prefixed(br#"{"command":"setting","period":"7"}"#);
    rig.events.write(1, &frame[..5]);
    rig.events.write(1, &frame[5..]);
    rig.tick();
    assert_eq!(rig.radio().last_to(1).unwrap()["data"]["period"], "00:00:07");
}

// ── Rejections ───────────────────────────────────────────────

#[test]
fn invalid_json_is_answered_with_error() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, "{not json}");
    let reply = rig.radio().last_to(1).unwrap();
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["message"], "Invalid JSON");
    assert!(reply.get("data").is_none());

    // The assembler recovered.
    rig.send(1, r#"{"command":"setting"}"#);
    assert_eq!(rig.radio().last_to(1).unwrap()["status"], "success");
}

#[test]
fn unknown_command_is_rejected_without_side_effects() {
    let mut rig = Rig::new();
    rig.connect(1);
    let before = rig.svc.settings().clone();
    rig.send(1, r#"{"command":"reboot","period":"5","name":"Other"}"#);
    let reply = rig.radio().last_to(1).unwrap();
    assert_eq!(reply["message"], "Unknown command");
    assert_eq!(rig.svc.settings(), &before);
    assert!(rig.svc.names().stored.is_none());
}

#[test]
fn zero_period_is_rejected() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, r#"{"command":"setting","period":"00:00:00"}"#);
    assert_eq!(rig.radio().last_to(1).unwrap()["status"], "error");
    assert_eq!(rig.svc.settings().period.as_secs(), 3600);
}

#[test]
fn malformed_time_keeps_schedule() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, r#"{"command":"setting","latest_time":"2025-01-01 00:00:00","period":"10"}"#);
    let armed = rig.svc.scheduler().state();
    rig.send(1, r#"{"command":"setting","latest_time":"tomorrow"}"#);
    assert_eq!(rig.radio().last_to(1).unwrap()["status"], "error");
    assert_eq!(rig.svc.scheduler().state(), armed);
}

// ── Rename ───────────────────────────────────────────────────

#[test]
fn rename_persists_across_restart() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, r#"{"command":"setting","name":"Lab-7"}"#);
    assert_eq!(rig.radio().last_to(1).unwrap()["data"]["name"], "Lab-7");
    assert_eq!(rig.radio().identity.as_deref(), Some("Lab-7"));
    // Peer still connected: no re-advertise yet.
    assert_eq!(rig.radio().adverts, 1);

    let (_radio, file, names, clock, sensor) = rig.svc.into_parts();
    assert_eq!(names.stored.as_deref(), Some("Lab-7"));
    let restarted = sensornode::app::service::NodeService::new(
        NodeConfig::default(),
        "MedMCAFE",
        crate::mock_hw::MockRadio::default(),
        file,
        names,
        clock,
        sensor,
    );
    assert_eq!(restarted.settings().name, "Lab-7");
}

#[test]
fn empty_name_is_ignored() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, r#"{"command":"setting","name":""}"#);
    assert_eq!(rig.radio().last_to(1).unwrap()["data"]["name"], "MedMCAFE");
    assert!(rig.svc.names().stored.is_none());
}

#[test]
fn overlong_name_is_rejected() {
    let mut rig = Rig::new();
    rig.connect(1);
    let json = format!(r#"{{"command":"setting","name":"{}"}}"#, "n".repeat(30));
    rig.send(1, &json);
    let reply = rig.radio().last_to(1).unwrap();
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["message"], "Invalid name");
    assert_eq!(rig.svc.settings().name, "MedMCAFE");
}

// ── Connections ──────────────────────────────────────────────

#[test]
fn readvertises_only_after_last_peer_leaves() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.connect(2);
    assert_eq!(rig.svc.tracker().peers().len(), 2);

    rig.events.disconnect(1);
    rig.tick();
    assert_eq!(rig.radio().adverts, 1);

    rig.events.disconnect(2);
    rig.tick();
    assert_eq!(rig.radio().adverts, 2);
    assert!(rig.sink.events.contains(&AppEvent::Disconnected {
        conn: 2,
        readvertised: true
    }));
}

#[test]
fn responses_go_to_the_writer_only() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.connect(2);
    rig.send(2, r#"{"command":"setting"}"#);
    assert!(rig.radio().messages_to(1).is_empty());
    assert_eq!(rig.radio().messages_to(2).len(), 1);
}

#[test]
fn watchdog_restarts_advertising_when_idle() {
    let mut rig = Rig::new();
    rig.tick();
    assert_eq!(rig.radio().adverts, 1);

    rig.svc.clock_mut().uptime_ms = 6_000;
    rig.tick();
    assert_eq!(rig.radio().adverts, 2);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::AdvertisingRestarted), 1);
}

#[test]
fn watchdog_stays_quiet_while_connected() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.svc.clock_mut().uptime_ms = 60_000;
    rig.tick();
    assert_eq!(rig.radio().adverts, 1);
}
