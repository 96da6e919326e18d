//! Start/stop lifecycle tests.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tcp_acceptor::net::{AcceptorExit, ListenerError};
use tcp_acceptor::{Server, ServerConfig, ServerError};

mod common;
use common::{send, test_config, wait_until, Recorder};

#[tokio::test]
async fn start_then_stop_is_bounded() {
    let server = Server::new(test_config(3401), Recorder::new());
    server.start().await.unwrap();
    assert!(server.is_running());
    let addr = server.local_addr().unwrap();
    assert_eq!(addr.port(), 3401);

    tokio::time::timeout(Duration::from_secs(1), server.stop())
        .await
        .expect("stop should finish within a few accept timeouts");

    assert!(server.is_stopped());
    assert!(!server.is_running());
    assert!(matches!(server.exit_reason(), Some(AcceptorExit::Stopped)));
    assert_eq!(server.open_connections(), 0);
    assert!(TcpStream::connect(addr).await.is_err(), "listener still open");
}

#[tokio::test]
async fn second_stop_is_a_no_op() {
    let server = Server::new(test_config(3402), Recorder::new());
    server.start().await.unwrap();
    server.stop().await;

    let started = Instant::now();
    server.stop().await;
    assert!(started.elapsed() < Duration::from_millis(50));
    assert!(server.is_stopped());
}

#[tokio::test]
async fn invalid_config_never_binds() {
    let empty_host = ServerConfig {
        host: String::new(),
        ..test_config(3403)
    };
    let server = Server::new(empty_host, Recorder::new());
    assert!(!server.is_enabled());
    server.start().await.unwrap();
    assert!(server.local_addr().is_none());
    assert!(TcpStream::connect("127.0.0.1:3403").await.is_err());
    server.stop().await;

    let low_port = Server::new(test_config(500), Recorder::new());
    assert!(!low_port.is_enabled());
    low_port.start().await.unwrap();
    low_port.stop().await;
    assert!(low_port.local_addr().is_none());
}

#[tokio::test]
async fn stop_waits_for_slow_handler() {
    let recorder = Recorder::slow(Duration::from_millis(300));
    let server = Server::new(test_config(3404), recorder.clone());
    server.start().await.unwrap();
    let addr = server.local_addr().unwrap();

    let _client = send(addr, b"slow").await;
    assert!(wait_until(|| recorder.entered() == 1, Duration::from_secs(2)).await);
    assert_eq!(recorder.completed(), 0);

    server.stop().await;

    assert_eq!(recorder.completed(), 1);
    assert_eq!(server.open_connections(), 0);
}

#[tokio::test]
async fn start_after_stop_is_rejected() {
    let server = Server::new(test_config(3405), Recorder::new());
    server.start().await.unwrap();
    assert!(matches!(server.start().await, Err(ServerError::AlreadyStarted)));

    server.stop().await;
    assert!(matches!(server.start().await, Err(ServerError::AlreadyStarted)));
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let _occupied = std::net::TcpListener::bind("127.0.0.1:3406").unwrap();

    let server = Server::new(test_config(3406), Recorder::new());
    let err = server.start().await.unwrap_err();
    assert!(matches!(err, ServerError::Listener(ListenerError::Bind(_))));
    assert!(!server.is_running());

    tokio::time::timeout(Duration::from_secs(1), server.stop())
        .await
        .expect("stop after failed start should not block");
}

#[tokio::test]
async fn dropped_server_closes_listener_and_drains() {
    let recorder = Recorder::slow(Duration::from_millis(150));
    let server = Server::new(test_config(3407), recorder.clone());
    server.start().await.unwrap();
    let addr = server.local_addr().unwrap();

    let _client = send(addr, b"in flight").await;
    assert!(wait_until(|| recorder.entered() == 1, Duration::from_secs(2)).await);

    drop(server);

    // The next accept timeout (100ms) ends the loop.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(TcpStream::connect(addr).await.is_err(), "dropped server still accepting");

    // In-flight handler still ran to completion.
    assert!(wait_until(|| recorder.completed() == 1, Duration::from_secs(1)).await);
    assert_eq!(recorder.entered(), 1);
}

#[tokio::test]
async fn stop_during_bind_leaves_no_listener() {
    let config = ServerConfig {
        // Name resolution yields, letting stop run mid-start.
        host: "localhost".to_string(),
        ..test_config(3408)
    };
    let server = Server::new(config, Recorder::new());

    let (started, ()) = tokio::join!(server.start(), server.stop());

    assert!(matches!(started, Err(ServerError::AlreadyStarted)));
    assert!(server.is_stopped());
    assert!(server.local_addr().is_none());
    assert!(TcpStream::connect("localhost:3408").await.is_err());
}
