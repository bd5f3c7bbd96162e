//! Integration tests for Session

mod common;

use common::TestClient;
use roomchat::server::{Session, SessionLimits};
use roomchat::ChatError;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

#[tokio::test]
async fn test_prompt_and_read_trims_answer() {
    let (client, server) = tokio::io::duplex(1024);
    let session = Session::new(server, "10.0.0.1:4000");
    let mut client = TestClient::new(client);

    let reader = tokio::spawn({
        let session = session.clone();
        async move { session.prompt_and_read("Name: ").await }
    });

    client.expect("Name: ").await;
    client.send("  Ana ").await;

    let answer = reader.await.unwrap().unwrap();
    assert_eq!(answer, "Ana");
}

#[tokio::test]
async fn test_empty_line_is_not_an_error() {
    let (client, server) = tokio::io::duplex(1024);
    let session = Session::new(server, "10.0.0.1:4001");
    let mut client = TestClient::new(client);

    client.send("").await;

    let answer = session.read_line().await.unwrap();
    assert_eq!(answer, "");
    assert!(session.is_open());
}

#[tokio::test]
async fn test_read_after_peer_hangs_up_is_transport_error() {
    let (client, server) = tokio::io::duplex(1024);
    let session = Session::new(server, "10.0.0.1:4002");
    drop(client);

    let err = session.read_line().await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_overlong_line_is_rejected() {
    let (client, server) = tokio::io::duplex(1024);
    let limits = SessionLimits {
        max_line_length: 8,
        ..SessionLimits::default()
    };
    let session = Session::with_limits(server, "10.0.0.1:4003", limits);
    let mut client = TestClient::new(client);

    client.send("this line is far too long").await;

    let err = session.read_line().await.unwrap_err();
    assert!(matches!(err, ChatError::LineTooLong { max: 8 }));
}

#[tokio::test]
async fn test_line_limit_excludes_terminator() {
    let (mut client, server) = tokio::io::duplex(1024);
    let limits = SessionLimits {
        max_line_length: 4,
        ..SessionLimits::default()
    };
    let session = Session::with_limits(server, "10.0.0.1:4010", limits);

    client.write_all(b"abcd\n").await.unwrap();
    assert_eq!(session.read_line().await.unwrap(), "abcd");

    client.write_all(b"abcd\r\n").await.unwrap();
    assert_eq!(session.read_line().await.unwrap(), "abcd");

    client.write_all(b"abcde\r\n").await.unwrap();
    let err = session.read_line().await.unwrap_err();
    assert!(matches!(err, ChatError::LineTooLong { max: 4 }));
}

#[tokio::test]
async fn test_line_one_past_limit_without_cr_is_rejected() {
    let (mut client, server) = tokio::io::duplex(1024);
    let limits = SessionLimits {
        max_line_length: 4,
        ..SessionLimits::default()
    };
    let session = Session::with_limits(server, "10.0.0.1:4011", limits);

    client.write_all(b"abcde\n").await.unwrap();
    let err = session.read_line().await.unwrap_err();
    assert!(matches!(err, ChatError::LineTooLong { max: 4 }));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (_client, server) = tokio::io::duplex(1024);
    let session = Session::new(server, "10.0.0.1:4004");

    assert!(session.close().await, "first close should report closing");
    assert!(!session.close().await, "second close is a no-op");
    assert!(!session.is_open());

    assert!(matches!(
        session.send_line("hello").await,
        Err(ChatError::SessionClosed)
    ));
    assert!(matches!(
        session.try_send_line("hello"),
        Err(ChatError::SessionClosed)
    ));
    assert!(matches!(
        session.read_line().await,
        Err(ChatError::SessionClosed)
    ));
}

#[tokio::test]
async fn test_close_interrupts_pending_read() {
    let (_client, server) = tokio::io::duplex(1024);
    let session = Session::new(server, "10.0.0.1:4005");

    let reader = tokio::spawn({
        let session = session.clone();
        async move { session.read_line().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    session.close().await;

    let result = timeout(Duration::from_secs(2), reader)
        .await
        .expect("read should finish after close")
        .unwrap();
    assert!(matches!(result, Err(ChatError::SessionClosed)));
}

#[tokio::test]
async fn test_close_flushes_queued_output_then_hangs_up() {
    let (client, server) = tokio::io::duplex(1024);
    let session = Session::new(server, "10.0.0.1:4006");
    let mut client = TestClient::new(client);

    session.send_line("first").await.unwrap();
    session.send_line("Bye!").await.unwrap();
    session.close().await;

    let rest = client.expect_closed().await;
    assert_eq!(rest, "first\nBye!\n");
}

#[tokio::test]
async fn test_send_error_on_closed_session_does_not_fail() {
    let (_client, server) = tokio::io::duplex(1024);
    let session = Session::new(server, "10.0.0.1:4007");
    session.close().await;

    // Best-effort: returns without error or panic
    session.send_error("ignored").await;
}

#[tokio::test]
async fn test_describe_and_rename() {
    let (_client, server) = tokio::io::duplex(1024);
    let session = Session::new(server, "10.0.0.1:4008");

    assert!(session.describe().contains("10.0.0.1:4008"));

    assert_eq!(session.set_name("Ana"), "");
    assert_eq!(session.set_name("Ana2"), "Ana");
    assert_eq!(session.name(), "Ana2");

    let described = session.describe();
    assert!(described.contains("Ana2"));
    assert!(described.contains("10.0.0.1:4008"));
}

#[tokio::test]
async fn test_sessions_have_distinct_ids() {
    let (_a, server_a) = tokio::io::duplex(64);
    let (_b, server_b) = tokio::io::duplex(64);

    let a = Session::new(server_a, "10.0.0.1:1");
    let b = Session::new(server_b, "10.0.0.1:1");

    assert_ne!(a.id(), b.id());
    assert_eq!(a.endpoint(), b.endpoint());
}
