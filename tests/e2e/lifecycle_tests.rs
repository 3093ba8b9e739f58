//! Connection lifecycle E2E tests: resolve -> open -> stream -> tear down
//!
//! These tests verify:
//! - Bytes reach the sink in order with LF rewritten to CRLF
//! - Start/stop interleavings never leak a connection
//! - Conflicting and duplicate starts
//! - Retry bounds for path lookup and open
//! - Teardown on stream errors and a clean restart afterwards

use crate::common::{settle, Harness, PATH, SERIAL};
use pretty_assertions::assert_eq;
use serial_watch::connection::{ConnectionState, StartOutcome};
use serial_watch::error::ConnectionError;
use std::io::ErrorKind;

#[tokio::test(start_paused = true)]
async fn test_streams_device_output_in_order() {
    let h = Harness::with_device();

    let outcome = h.manager.start(&h.identity).await.unwrap();
    assert_eq!(
        outcome,
        StartOutcome::Connected {
            path: PATH.to_string()
        }
    );

    let port = h.backend.last_opened().unwrap();
    port.push_bytes(b"hello\n");
    port.push_bytes(b"world");
    settle(10).await;

    assert_eq!(h.sink.contents(), "hello\r\nworld");
    assert_eq!(h.manager.connected_path().as_deref(), Some(PATH));
    assert_eq!(
        h.manager.state(),
        ConnectionState::Open {
            path: PATH.to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_serial_number_match_ignores_case() {
    let h = Harness::new();
    h.backend.add_port(PATH, &SERIAL.to_lowercase());

    assert!(h.manager.start(&h.identity).await.is_ok());
    assert_eq!(h.backend.open_attempts(), vec![PATH.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_immediately_after_start_opens_nothing() {
    let h = Harness::with_device();

    let start = h.manager.spawn_start(h.identity.clone());
    settle(1).await;
    assert_eq!(h.manager.state(), ConnectionState::ResolvingPath);

    h.manager.stop().await;
    let result = start.await.unwrap();

    assert!(matches!(result, Err(ConnectionError::Cancelled)));
    assert!(h.backend.open_attempts().is_empty());
    assert_eq!(h.manager.state(), ConnectionState::Idle);
    assert_eq!(h.manager.connections_opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_reuses_open_connection() {
    let h = Harness::with_device();

    h.manager.start(&h.identity).await.unwrap();
    let again = h.manager.start(&h.identity).await.unwrap();

    assert_eq!(
        again,
        StartOutcome::AlreadyOpen {
            path: PATH.to_string()
        }
    );
    assert_eq!(h.manager.connections_opened(), 1);
    assert_eq!(h.backend.open_attempts().len(), 1);
    assert!(!h.backend.last_opened().unwrap().is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_newer_start_supersedes_pending_start() {
    let h = Harness::new();

    let first = h.manager.spawn_start(h.identity.clone());
    // Past the settle delay: the first start is waiting between lookups.
    settle(150).await;
    assert_eq!(h.manager.state(), ConnectionState::ResolvingPath);

    let second = h.manager.spawn_start(h.identity.clone());
    settle(1).await;
    h.backend.add_port(PATH, SERIAL);

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert!(matches!(first, Err(ConnectionError::Cancelled)));
    assert_eq!(
        second.unwrap(),
        StartOutcome::Connected {
            path: PATH.to_string()
        }
    );
    assert_eq!(h.manager.connections_opened(), 1);
    assert_eq!(h.backend.open_attempts(), vec![PATH.to_string()]);
    assert_eq!(
        h.manager.state(),
        ConnectionState::Open {
            path: PATH.to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_conflicting_path_is_rejected_without_retry() {
    let h = Harness::with_device();
    h.manager.start(&h.identity).await.unwrap();

    // Device re-enumerated under a new node while the old one is still held.
    h.backend.remove_port(PATH);
    h.backend.add_port("/dev/ttyY", SERIAL);

    let result = h.manager.start(&h.identity).await;

    match result {
        Err(ConnectionError::ConflictingConnection { open, requested }) => {
            assert_eq!(open, PATH);
            assert_eq!(requested, "/dev/ttyY");
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
    assert_eq!(h.backend.open_attempts(), vec![PATH.to_string()]);
    assert_eq!(h.manager.connected_path().as_deref(), Some(PATH));
}

#[tokio::test(start_paused = true)]
async fn test_stop_without_connection_is_noop() {
    let h = Harness::new();

    h.manager.stop().await;
    h.manager.stop().await;

    assert_eq!(h.manager.state(), ConnectionState::Idle);
    assert_eq!(h.manager.connections_opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_closes_port_before_returning() {
    let h = Harness::with_device();
    h.manager.start(&h.identity).await.unwrap();
    let port = h.backend.last_opened().unwrap();

    h.manager.stop().await;

    assert!(port.is_closed());
    assert_eq!(h.manager.state(), ConnectionState::Idle);
    assert_eq!(h.manager.connected_path(), None);
}

#[tokio::test(start_paused = true)]
async fn test_path_lookup_gives_up_after_bounded_attempts() {
    let h = Harness::new();

    let result = h.manager.start(&h.identity).await;

    assert!(matches!(
        result,
        Err(ConnectionError::PathNotFound { .. })
    ));
    assert!(h.backend.open_attempts().is_empty());
    assert_eq!(h.manager.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_port_appearing_during_lookup_is_found() {
    let h = Harness::new();

    let start = h.manager.spawn_start(h.identity.clone());
    settle(250).await;
    h.backend.add_port(PATH, SERIAL);

    let outcome = start.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        StartOutcome::Connected {
            path: PATH.to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_open_retries_until_port_is_free() {
    let h = Harness::with_device();
    h.backend.fail_opens(PATH, 2);

    let outcome = h.manager.start(&h.identity).await.unwrap();

    assert!(matches!(outcome, StartOutcome::Connected { .. }));
    assert_eq!(h.backend.open_attempts().len(), 3);
    assert_eq!(h.manager.connections_opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_gives_up_after_bounded_attempts() {
    let h = Harness::with_device();
    h.backend.fail_opens(PATH, u32::MAX);

    let result = h.manager.start(&h.identity).await;

    assert!(matches!(result, Err(ConnectionError::Open { .. })));
    assert_eq!(h.backend.open_attempts().len(), 5);
    assert_eq!(h.manager.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_open_retry_wait_ends_promptly() {
    let h = Harness::with_device();
    h.backend.fail_opens(PATH, u32::MAX);

    let start = h.manager.spawn_start(h.identity.clone());
    settle(150).await;
    assert!(matches!(
        h.manager.state(),
        ConnectionState::Opening { .. }
    ));

    let before = tokio::time::Instant::now();
    h.manager.stop().await;
    let result = start.await.unwrap();

    assert!(matches!(result, Err(ConnectionError::Cancelled)));
    assert!(before.elapsed() < std::time::Duration::from_millis(500));
    assert_eq!(h.manager.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stream_error_tears_down_then_restart_succeeds() {
    let h = Harness::with_device();
    h.manager.start(&h.identity).await.unwrap();
    let first = h.backend.last_opened().unwrap();

    first.fail(ErrorKind::BrokenPipe, "device gone");
    settle(10).await;

    assert!(first.is_closed());
    assert_eq!(h.manager.state(), ConnectionState::Idle);

    h.manager.start(&h.identity).await.unwrap();
    let second = h.backend.last_opened().unwrap();
    second.push_bytes(b"again\n");
    settle(10).await;

    assert_eq!(h.manager.connections_opened(), 2);
    assert!(h.sink.contents().ends_with("again\r\n"));
}

#[tokio::test(start_paused = true)]
async fn test_end_of_stream_tears_down() {
    let h = Harness::with_device();
    h.manager.start(&h.identity).await.unwrap();
    let port = h.backend.last_opened().unwrap();

    port.hang_up();
    settle(10).await;

    assert!(port.is_closed());
    assert_eq!(h.manager.connected_path(), None);
    // A stop after the reader already tore down is harmless.
    h.manager.stop().await;
    assert_eq!(h.manager.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_transient_read_errors_keep_connection() {
    let h = Harness::with_device();
    h.manager.start(&h.identity).await.unwrap();
    let port = h.backend.last_opened().unwrap();

    port.fail(ErrorKind::TimedOut, "no data");
    port.push_bytes(b"ok\n");
    settle(10).await;

    assert!(!port.is_closed());
    assert_eq!(h.sink.contents(), "ok\r\n");
}
