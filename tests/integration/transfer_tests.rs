//! `update` command: batched log transfer end to end.

use sensornode::app::events::AppEvent;
use sensornode::error::TransferError;
use sensornode::events::RadioEvent;

use crate::mock_hw::Rig;

#[test]
fn update_streams_batches_then_truncates() {
    let mut rig = Rig::with_lines(25);
    rig.connect(1);
    rig.send(1, r#"{"command":"update"}"#);

    assert_eq!(rig.radio().batches_to(1), vec![(1, 3), (2, 3), (3, 3)]);
    let msgs = rig.radio().messages_to(1);
    assert_eq!(msgs.len(), 4);
    assert_eq!(msgs[0]["data"].as_array().unwrap().len(), 10);
    assert_eq!(msgs[2]["data"].as_array().unwrap().len(), 5);
    assert_eq!(msgs[0]["data"][0], "2025-01-01T00:00:00,21.5,40,30");

    let done = &msgs[3];
    assert_eq!(done["status"], "success");
    assert_eq!(done["message"], "Data update");

    // Only the record sampled after the transfer, on the RTC loaded from the origin.
    assert_eq!(rig.log_lines(), vec!["2025-01-01T00:00:00,21.5,40.25,30"]);
    assert_eq!(
        rig.svc.store().file().text.as_deref(),
        Some("time,tp,hd,cputp\n2025-01-01T00:00:00,21.5,40.25,30\n")
    );
    // Paced between batches only.
    assert_eq!(rig.delay.total_ms, 600);
    assert!(rig.sink.events.contains(&AppEvent::TransferCompleted {
        batches: 3,
        lines: 25
    }));
}

#[test]
fn empty_log_reports_no_data_then_done() {
    let mut rig = Rig::new();
    rig.connect(1);
    rig.send(1, r#"{"command":"update"}"#);
    let msgs = rig.radio().messages_to(1);
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0]["message"], "No data available");
    assert_eq!(msgs[1]["message"], "Data update");
    assert_eq!(msgs[1]["status"], "success");
}

#[test]
fn update_while_queued_is_busy() {
    let mut rig = Rig::with_lines(3);
    rig.connect(1);
    rig.events.write(1, br#"{"command":"update"}"#);
    rig.events.write(1, br#"{"command":"update"}"#);
    rig.tick();

    let msgs = rig.radio().messages_to(1);
    assert_eq!(msgs[0]["status"], "error");
    assert_eq!(msgs[0]["message"], "Transfer in progress");
    // Only one transfer ran.
    assert_eq!(rig.radio().batches_to(1), vec![(1, 1)]);
    assert_eq!(msgs.last().unwrap()["message"], "Data update");
}

#[test]
fn update_written_mid_transfer_is_refused_at_once() {
    let mut rig = Rig::with_lines(25);
    rig.connect(1);
    let events = rig.events.clone();
    let write = RadioEvent::write(1, br#"{"command":"update"}"#).unwrap();
    rig.radio_mut().inject_after = Some((1, write, events));
    rig.send(1, r#"{"command":"update"}"#);

    let msgs = rig.radio().messages_to(1);
    assert_eq!(msgs.len(), 5);
    assert_eq!(msgs[0]["batch"]["index"], 1);
    // Refused between batches, not after the final response.
    assert_eq!(msgs[1]["status"], "error");
    assert_eq!(msgs[1]["message"], "Transfer in progress");
    assert_eq!(msgs[2]["batch"]["index"], 2);
    assert_eq!(msgs[3]["batch"]["index"], 3);
    assert_eq!(msgs[4]["message"], "Data update");
    assert_eq!(rig.radio().batches_to(1), vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::CommandRejected(_))),
        1
    );
}

#[test]
fn disconnect_mid_transfer_keeps_log() {
    let mut rig = Rig::with_lines(25);
    rig.connect(1);
    let events = rig.events.clone();
    rig.radio_mut().inject_after = Some((2, RadioEvent::Disconnected(1), events));
    rig.send(1, r#"{"command":"update"}"#);

    assert_eq!(rig.radio().batches_to(1), vec![(1, 3), (2, 3)]);
    // No final response to a peer that is gone.
    assert_eq!(rig.radio().messages_to(1).len(), 2);
    // Kept lines plus the record sampled after the abort.
    assert_eq!(rig.log_lines().len(), 26);
    assert!(rig.sink.events.contains(&AppEvent::TransferFailed(
        TransferError::Disconnected { before_batch: 3 }
    )));
    // Last peer gone: advertising resumed.
    assert_eq!(rig.radio().adverts, 2);
}

#[test]
fn retry_after_abort_resends_from_first_batch() {
    let mut rig = Rig::with_lines(15);
    rig.connect(1);
    let events = rig.events.clone();
    rig.radio_mut().inject_after = Some((1, RadioEvent::Disconnected(1), events));
    rig.send(1, r#"{"command":"update"}"#);
    assert_eq!(rig.log_lines().len(), 16);

    rig.radio_mut().inject_after = None;
    rig.radio_mut().clear();
    rig.connect(2);
    rig.send(2, r#"{"command":"update"}"#);
    assert_eq!(rig.radio().batches_to(2), vec![(1, 2), (2, 2)]);
    assert!(rig.log_lines().is_empty());
}

#[test]
fn failed_batch_reports_error_and_keeps_log() {
    let mut rig = Rig::with_lines(25);
    rig.connect(1);
    rig.radio_mut().fail_notify_at = Some(1);
    rig.send(1, r#"{"command":"update"}"#);

    let msgs = rig.radio().messages_to(1);
    assert_eq!(rig.radio().batches_to(1), vec![(1, 3)]);
    let done = msgs.last().unwrap();
    assert_eq!(done["status"], "error");
    assert_eq!(done["message"], "Data update");
    assert_eq!(rig.log_lines().len(), 26);
    assert!(rig.sink.events.contains(&AppEvent::TransferFailed(
        TransferError::SendFailed { batch: 2 }
    )));
}

#[test]
fn truncate_failure_is_reported() {
    let mut rig = Rig::with_lines(5);
    rig.connect(1);
    rig.svc.store_mut().file_mut().fail_overwrite = true;
    rig.send(1, r#"{"command":"update"}"#);

    let done = rig.radio().last_to(1).unwrap();
    assert_eq!(done["status"], "error");
    assert_eq!(rig.radio().batches_to(1), vec![(1, 1)]);
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::TransferFailed(TransferError::Truncate)));
}

#[test]
fn setting_during_transfer_applies_after_it() {
    let mut rig = Rig::with_lines(25);
    rig.connect(1);
    let events = rig.events.clone();
    let write = RadioEvent::write(1, br#"{"command":"setting","period":"42"}"#).unwrap();
    rig.radio_mut().inject_after = Some((1, write, events));
    rig.send(1, r#"{"command":"update"}"#);

    let msgs = rig.radio().messages_to(1);
    assert_eq!(msgs.len(), 5);
    assert_eq!(rig.radio().batches_to(1).len(), 3);
    assert_eq!(msgs[3]["message"], "Data update");
    assert_eq!(msgs[4]["message"], "Settings update");
    assert_eq!(msgs[4]["data"]["period"], "00:00:42");
    assert_eq!(rig.svc.settings().period.as_secs(), 42);
}

#[test]
fn update_with_settings_applies_them_first() {
    let mut rig = Rig::with_lines(2);
    rig.connect(1);
    rig.send(
        1,
        r#"{"command":"update","latest_time":"2025-02-01 12:00:00","period":"60","name":"Shed"}"#,
    );
    assert_eq!(rig.svc.settings().name, "Shed");
    assert_eq!(rig.svc.settings().period.as_secs(), 60);
    assert_eq!(rig.svc.clock().sets.len(), 1);
    assert_eq!(rig.radio().batches_to(1), vec![(1, 1)]);
}
