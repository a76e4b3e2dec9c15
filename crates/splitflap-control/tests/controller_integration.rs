//! Integration tests for DisplayController
//!
//! These drive the full controller against the mock display: concurrent
//! writers, lock contention, calibration rollback and save reporting.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use splitflap_control::{
    CalibrationPhase, ControlError, ControllerConfig, DisplayController, ErrorKind,
    NegativeDeltaMode, SaveCalibrationResponse,
};
use splitflap_core::constants::DEFAULT_ALPHABET;
use splitflap_core::{DeviceAlphabet, normalize};
use splitflap_hardware::mock::{MockConnector, MockDisplayHandle};
use splitflap_hardware::{CalibrationCommand, ForceMovement, TransportError};

async fn connected(config: ControllerConfig) -> (Arc<DisplayController>, MockDisplayHandle) {
    let (connector, handle) = MockConnector::new();
    let controller = DisplayController::new(connector, config).unwrap();
    controller.connect().await.unwrap();
    (Arc::new(controller), handle)
}

#[tokio::test]
async fn test_hello_is_padded() {
    let (controller, handle) = connected(ControllerConfig::default()).await;

    let shown = controller.set_text("hello", false).await.unwrap();
    assert_eq!(shown.message.as_string(), "HELLO ");
    assert!(!shown.truncated);
    assert_eq!(handle.frames(), vec!["HELLO ".to_string()]);
}

#[tokio::test]
async fn test_long_text_is_truncated() {
    let (controller, handle) = connected(ControllerConfig::default()).await;

    let shown = controller.set_text("1234567", true).await.unwrap();
    assert_eq!(shown.message.as_string(), "123456");
    assert!(shown.truncated);

    let writes = handle.text_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].text, "123456");
    assert_eq!(writes[0].force, ForceMovement::All);
}

#[tokio::test]
async fn test_empty_text_rejected_without_write() {
    let (controller, handle) = connected(ControllerConfig::default()).await;

    let result = controller.set_text("", false).await;
    assert!(matches!(
        result,
        Err(ControlError::Validation(splitflap_core::Error::EmptyMessage))
    ));
    assert!(handle.wire().is_empty());
}

#[tokio::test]
async fn test_invalid_characters_listed() {
    let (controller, handle) = connected(ControllerConfig::default()).await;

    let err = controller.set_text("A$B", false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCharacters);
    assert!(!err.kind().is_retryable());
    match err {
        ControlError::Validation(splitflap_core::Error::InvalidCharacters { invalid, .. }) => {
            assert_eq!(invalid, vec!['$']);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(handle.frames().is_empty());
}

#[tokio::test]
async fn test_set_text_requires_connection() {
    let (connector, handle) = MockConnector::new();
    let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();

    let result = controller.set_text("HI", false).await;
    assert!(matches!(result, Err(ControlError::NotConnected)));
    assert_eq!(handle.connect_count(), 0);
}

#[tokio::test]
async fn test_concurrent_writers_never_interleave() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    let alphabet = DeviceAlphabet::default();
    let texts: Vec<String> = (0..8).map(|i| format!("MSG{i}")).collect();

    let tasks: Vec<_> = texts
        .iter()
        .cloned()
        .map(|text| {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.set_text(&text, false).await })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let expected: HashSet<String> = texts
        .iter()
        .map(|t| normalize(t, 6, &alphabet).unwrap().message.as_string())
        .collect();
    let frames = handle.frames();

    assert_eq!(frames.len(), texts.len());
    assert_eq!(frames.iter().cloned().collect::<HashSet<_>>(), expected);
    assert_eq!(handle.max_in_flight(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adjustments_to_same_module() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    handle.set_command_delay(Duration::from_millis(2));
    let callers = 20;

    let tasks: Vec<_> = (0..callers)
        .map(|_| {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.adjust_calibration(3, 1).await })
        })
        .collect();
    let mut offsets: Vec<i32> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|result| result.unwrap().unwrap())
        .collect();
    offsets.sort_unstable();

    assert_eq!(offsets, (1..=callers).collect::<Vec<_>>());
    let state = controller.calibration_state().await.unwrap();
    assert_eq!(state.offset(3).unwrap(), callers);
    assert_eq!(handle.device_offsets()[3], callers);
    assert_eq!(handle.calibration_commands().len(), callers as usize);
    assert_eq!(handle.max_in_flight(), 1);
}

#[tokio::test]
async fn test_lock_contention_returns_busy() {
    let config = ControllerConfig {
        lock_timeout_ms: 50,
        ..ControllerConfig::default()
    };
    let (controller, handle) = connected(config).await;
    handle.set_command_delay(Duration::from_millis(400));

    let slow = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.set_text("SLOW", false).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let result = controller.set_text("FAST", false).await;
    let waited = started.elapsed();

    assert!(matches!(result, Err(ControlError::Busy { waited_ms: 50 })));
    assert!(waited < Duration::from_millis(300), "waited {waited:?}");

    slow.await.unwrap().unwrap();
    assert_eq!(handle.frames(), vec!["SLOW  ".to_string()]);
}

#[tokio::test]
async fn test_status_does_not_wait_for_lock() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    handle.set_command_delay(Duration::from_millis(300));

    let slow = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.recalibrate_all().await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let status = controller.get_status();
    assert!(status.connected);
    assert_eq!(status.module_count, 6);
    assert_eq!(status.transport_identifier.as_deref(), Some("/dev/ttyUSB0"));

    slow.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_adjust_three_times_then_commit() {
    let (controller, handle) = connected(ControllerConfig::default()).await;

    for expected in 1..=3 {
        let offset = controller.adjust_calibration(2, 1).await.unwrap();
        assert_eq!(offset, expected);
    }
    controller.adjust_calibration(4, 5).await.unwrap();
    controller.commit_calibration(2).await.unwrap();

    let state = controller.calibration_state().await.unwrap();
    assert_eq!(state.offsets(), vec![0, 0, 0, 0, 5, 0]);
    assert_eq!(state.phase(2).unwrap(), CalibrationPhase::Committed);
    assert_eq!(state.phase(4).unwrap(), CalibrationPhase::Adjusting);
    assert_eq!(state.phase(0).unwrap(), CalibrationPhase::Uncalibrated);

    assert_eq!(handle.device_offsets(), vec![0, 0, 0, 0, 5, 0]);
    assert_eq!(
        handle.calibration_commands().last(),
        Some(&(2, CalibrationCommand::CommitZero))
    );
}

#[tokio::test]
async fn test_zero_delta_sends_nothing() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    controller.adjust_calibration(1, 2).await.unwrap();

    let offset = controller.adjust_calibration(1, 0).await.unwrap();
    assert_eq!(offset, 2);
    assert_eq!(handle.calibration_commands().len(), 1);
}

#[tokio::test]
async fn test_adjust_out_of_range() {
    let (controller, handle) = connected(ControllerConfig::default()).await;

    let err = controller.adjust_calibration(6, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModuleOutOfRange);
    assert_eq!(err.to_string(), "Module 6 out of range (valid: 0..6)");
    assert!(handle.calibration_commands().is_empty());
}

#[tokio::test]
async fn test_failed_adjust_leaves_offset() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    handle.fail_next_calibrations(1);

    let err = controller.adjust_calibration(0, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportError);

    let state = controller.calibration_state().await.unwrap();
    assert_eq!(state.offset(0).unwrap(), 0);
    assert_eq!(state.phase(0).unwrap(), CalibrationPhase::Uncalibrated);
    assert!(controller.get_status().connected);
}

#[tokio::test]
async fn test_failed_commit_rolls_back() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    controller.adjust_calibration(2, 3).await.unwrap();
    handle.fail_next_calibrations(1);

    let result = controller.commit_calibration(2).await;
    assert!(matches!(
        result,
        Err(ControlError::Transport(TransportError::Communication { .. }))
    ));

    let state = controller.calibration_state().await.unwrap();
    assert_eq!(state.offset(2).unwrap(), 3);
    assert_eq!(state.phase(2).unwrap(), CalibrationPhase::Adjusting);
}

#[tokio::test]
async fn test_commit_without_adjustment() {
    let (controller, _handle) = connected(ControllerConfig::default()).await;

    controller.commit_calibration(5).await.unwrap();
    let state = controller.calibration_state().await.unwrap();
    assert_eq!(state.phase(5).unwrap(), CalibrationPhase::Committed);
}

#[tokio::test]
async fn test_native_negative_delta() {
    let (controller, handle) = connected(ControllerConfig::default()).await;

    let offset = controller.adjust_calibration(3, -5).await.unwrap();
    assert_eq!(offset, -5);
    assert_eq!(
        handle.calibration_commands(),
        vec![(3, CalibrationCommand::Adjust { tenths: -5 })]
    );
}

#[tokio::test]
async fn test_native_negative_delta_rejected_by_firmware() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    handle.reject_negative_deltas(true);

    let result = controller.adjust_calibration(3, -1).await;
    assert!(matches!(
        result,
        Err(ControlError::Transport(TransportError::Unsupported { .. }))
    ));
    let state = controller.calibration_state().await.unwrap();
    assert_eq!(state.offset(3).unwrap(), 0);
}

#[tokio::test]
async fn test_forward_wrap_negative_delta() {
    let config = ControllerConfig {
        negative_deltas: NegativeDeltaMode::ForwardWrap,
        ..ControllerConfig::default()
    };
    let (controller, handle) = connected(config).await;
    handle.reject_negative_deltas(true);

    let offset = controller.adjust_calibration(3, -1).await.unwrap();
    assert_eq!(offset, -1);

    let sent: Vec<i32> = handle
        .calibration_commands()
        .into_iter()
        .map(|(module_id, command)| {
            assert_eq!(module_id, 3);
            match command {
                CalibrationCommand::Adjust { tenths } => tenths,
                CalibrationCommand::CommitZero => panic!("unexpected commit"),
            }
        })
        .collect();
    assert_eq!(sent, vec![5, 1, 1, 1, 1]);
    assert_eq!(handle.device_offsets()[3], 9);
}

#[tokio::test]
async fn test_save_all_modules() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    controller.adjust_calibration(1, 4).await.unwrap();

    let results = controller.save_calibration().await.unwrap();
    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.ok));
    assert_eq!(
        results.iter().map(|r| r.module_id).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4, 5]
    );
    assert_eq!(handle.persisted_offsets(), vec![0, 4, 0, 0, 0, 0]);
}

#[tokio::test]
async fn test_save_partial_failure() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    controller.adjust_calibration(0, 2).await.unwrap();
    controller.adjust_calibration(1, 3).await.unwrap();
    handle.fail_persist_for(1);
    handle.omit_from_persist(4);

    let result = controller.save_calibration().await;
    let response = SaveCalibrationResponse::from_result(&result);

    match result {
        Err(ControlError::Persistence { failed, results }) => {
            assert_eq!(failed, vec![1, 4]);
            assert_eq!(results.len(), 6);
            assert!(results[0].ok);
            assert_eq!(results[1].error.as_deref(), Some("EEPROM write failed"));
            assert_eq!(results[4].error.as_deref(), Some("no acknowledgement"));
            assert!(
                results
                    .windows(2)
                    .all(|w| w[0].module_id < w[1].module_id)
            );
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert!(!response.success);
    assert_eq!(response.error, Some(ErrorKind::PersistenceError));
    assert_eq!(response.per_module_results.len(), 6);
    assert_eq!(handle.persisted_offsets()[0], 2);
    assert_eq!(handle.persisted_offsets()[1], 0);
}

#[tokio::test]
async fn test_degraded_until_announced() {
    let (connector, handle) = MockConnector::booting(8, DEFAULT_ALPHABET.to_vec());
    let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();

    let snapshot = controller.connect().await.unwrap();
    assert!(snapshot.degraded);
    assert_eq!(snapshot.module_count, 6);

    controller.set_text("HI", false).await.unwrap();
    assert_eq!(handle.shown_text(), "HI    ");

    handle.announce();
    controller.set_text("HI", false).await.unwrap();
    assert_eq!(handle.shown_text(), "HI      ");

    let status = controller.get_status();
    assert!(!status.degraded);
    assert_eq!(status.module_count, 8);
}

#[tokio::test]
async fn test_retry_after_unplug() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    handle.unplug();

    controller.set_text("BACK", false).await.unwrap();
    assert_eq!(handle.connect_count(), 2);
    assert_eq!(handle.frames(), vec!["BACK  ".to_string()]);
    assert!(controller.get_status().connected);
}

#[tokio::test]
async fn test_no_retry_when_disabled() {
    let config = ControllerConfig {
        retry_after_reconnect: false,
        ..ControllerConfig::default()
    };
    let (controller, handle) = connected(config).await;
    handle.unplug();

    let err = controller.set_text("BACK", false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportError);
    assert!(err.kind().is_retryable());
    assert_eq!(handle.connect_count(), 1);
    assert!(!controller.get_status().connected);
}

#[tokio::test]
async fn test_calibration_is_never_retried() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    handle.unplug();

    let result = controller.adjust_calibration(0, 1).await;
    assert!(matches!(
        result,
        Err(ControlError::Transport(TransportError::Disconnected { .. }))
    ));
    assert_eq!(handle.connect_count(), 1);
    assert!(handle.calibration_commands().is_empty());
}

#[tokio::test]
async fn test_round_trip_timeout_tears_down_link() {
    let config = ControllerConfig {
        command_timeout_ms: 50,
        ..ControllerConfig::default()
    };
    let (controller, handle) = connected(config).await;
    handle.set_command_delay(Duration::from_millis(300));

    let result = controller.adjust_calibration(0, 1).await;
    assert!(matches!(
        result,
        Err(ControlError::Transport(TransportError::Timeout { duration_ms: 50 }))
    ));
    assert!(!controller.get_status().connected);
    assert!(!handle.is_link_alive());

    let state = controller.calibration_state().await.unwrap();
    assert_eq!(state.offset(0).unwrap(), 0);
}

#[tokio::test]
async fn test_abandoned_command_releases_lock() {
    let (controller, handle) = connected(ControllerConfig::default()).await;
    handle.set_command_delay(Duration::from_millis(500));

    let task = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.set_text("GONE", false).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    handle.set_command_delay(Duration::ZERO);
    let result = controller.recalibrate_all().await;

    assert!(matches!(result, Err(ControlError::NotConnected)));
    assert!(!controller.get_status().connected);
    assert_eq!(handle.close_count(), 1);
    assert!(handle.frames().is_empty());

    controller.connect().await.unwrap();
    controller.set_text("AGAIN", false).await.unwrap();
    assert_eq!(handle.frames(), vec!["AGAIN ".to_string()]);
}

#[tokio::test]
async fn test_connect_dropped_while_probing_is_torn_down() {
    let (connector, handle) = MockConnector::new();
    let controller = Arc::new(DisplayController::new(connector, ControllerConfig::default()).unwrap());
    handle.set_probe_delay(Duration::from_millis(300));

    let task = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.connect().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert!(!controller.get_status().connected);

    handle.set_probe_delay(Duration::ZERO);
    let result = controller.set_text("HI", false).await;

    assert!(matches!(result, Err(ControlError::NotConnected)));
    assert!(handle.frames().is_empty());
    assert!(!handle.is_link_alive());
    assert_eq!(handle.is_link_alive(), controller.get_status().connected);
    assert_eq!(handle.close_count(), 1);

    controller.connect().await.unwrap();
    controller.set_text("HI", false).await.unwrap();
    assert_eq!(handle.frames(), vec!["HI    ".to_string()]);
}

#[tokio::test]
async fn test_connect_failure_surfaces_connection_error() {
    let (connector, handle) = MockConnector::new();
    let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();
    handle.fail_next_connects(1);

    let err = controller.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionError);
    assert!(!controller.get_status().connected);

    controller.connect().await.unwrap();
    assert!(controller.get_status().connected);
}

#[tokio::test]
async fn test_disconnect_twice() {
    let (controller, handle) = connected(ControllerConfig::default()).await;

    controller.disconnect().await.unwrap();
    controller.disconnect().await.unwrap();

    assert_eq!(handle.close_count(), 1);
    let status = controller.get_status();
    assert!(!status.connected);
    assert_eq!(status.error.as_deref(), Some("Display is not connected"));
}

#[tokio::test]
async fn test_calibration_survives_reconnect() {
    let (controller, _handle) = connected(ControllerConfig::default()).await;
    controller.adjust_calibration(2, 7).await.unwrap();

    controller.disconnect().await.unwrap();
    controller.connect().await.unwrap();

    let state = controller.calibration_state().await.unwrap();
    assert_eq!(state.offset(2).unwrap(), 7);
}
