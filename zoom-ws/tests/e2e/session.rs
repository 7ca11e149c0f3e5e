use super::common;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use zoom_ws::{
    run_session, Credentials, Dispatcher, Envelope, KeepaliveExit, Session, SessionConfig,
    SessionEnd, SessionError, HEARTBEAT_FRAME, USER_CREATED,
};

fn config(oauth_base: &str, stream_url: &str) -> SessionConfig {
    SessionConfig::new(
        Credentials::new(common::ACCOUNT_ID, common::CLIENT_ID, common::CLIENT_SECRET),
        stream_url,
    )
    .with_oauth_url(oauth_base)
    .with_connect_timeout(Duration::from_secs(5))
}

fn counting_dispatcher(hits: &Arc<AtomicUsize>) -> Dispatcher {
    let hits = Arc::clone(hits);
    Dispatcher::new().on(USER_CREATED, move |_: &Envelope| {
        hits.fetch_add(1, Ordering::SeqCst);
    })
}

/// One `user.created` frame, then the server closes: handler fires once, loop ends cleanly.
#[tokio::test]
async fn user_created_frame_then_close() {
    let (_oauth, oauth_base) = common::mock_oauth(200, r#"{"access_token":"abc"}"#).await;
    let stream = common::spawn_stream(
        vec![r#"{"content":"{\"event\":\"user.created\"}"}"#.to_string()],
        Duration::from_millis(50),
    )
    .await;
    let hits = Arc::new(AtomicUsize::new(0));

    let report = timeout(
        Duration::from_secs(10),
        run_session(&config(&oauth_base, &stream.base_url), &counting_dispatcher(&hits)),
    )
    .await
    .expect("session finished")
    .expect("session started");

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(report.end, SessionEnd::Closed);
    assert_eq!(
        stream.log.queries(),
        vec![Some("subscriptionId=sub-1&access_token=abc".to_string())]
    );
}

/// Bad and unknown frames are skipped; only the recognized event reaches the handler.
#[tokio::test]
async fn mixed_frames_only_dispatch_user_created() {
    let (_oauth, oauth_base) = common::mock_oauth(200, r#"{"access_token":"abc"}"#).await;
    let stream = common::spawn_stream(
        vec![
            "not json at all".to_string(),
            r#"{"module":"heartbeat","success":true}"#.to_string(),
            r#"{"content":"{broken"}"#.to_string(),
            common::event_frame("meeting.started"),
            common::event_frame(USER_CREATED),
            common::event_frame(USER_CREATED),
        ],
        Duration::from_millis(50),
    )
    .await;
    let hits = Arc::new(AtomicUsize::new(0));

    let report = timeout(
        Duration::from_secs(10),
        run_session(&config(&oauth_base, &stream.base_url), &counting_dispatcher(&hits)),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(report.end, SessionEnd::Closed);
}

/// While the connection is idle the keepalive task writes `heartbeat` frames; it is
/// cancelled when the receive loop ends.
#[tokio::test]
async fn heartbeats_reach_server_and_stop_on_close() {
    let (_oauth, oauth_base) = common::mock_oauth(200, r#"{"access_token":"abc"}"#).await;
    let stream = common::spawn_stream(Vec::new(), Duration::from_millis(550)).await;
    let cfg = config(&oauth_base, &stream.base_url).with_heartbeat_interval(Duration::from_millis(100));

    let report = timeout(
        Duration::from_secs(10),
        run_session(&cfg, &Dispatcher::new()),
    )
    .await
    .unwrap()
    .unwrap();

    let received = stream.log.received();
    assert!(received.len() >= 2, "heartbeats received: {received:?}");
    assert!(received.iter().all(|f| f == HEARTBEAT_FRAME));
    assert_eq!(report.end, SessionEnd::Closed);
    let keepalive = report.keepalive.expect("keepalive ran");
    assert!(keepalive.sent() >= received.len() as u64);
}

#[tokio::test]
async fn close_without_receive_loop_cancels_keepalive() {
    let (_oauth, oauth_base) = common::mock_oauth(200, r#"{"access_token":"abc"}"#).await;
    let stream = common::spawn_stream(Vec::new(), Duration::from_secs(5)).await;
    let cfg = config(&oauth_base, &stream.base_url).with_heartbeat_interval(Duration::from_secs(60));

    let mut session = Session::open(&cfg).await.unwrap();
    assert_eq!(session.access_token().as_str(), "abc");
    assert_eq!(session.credentials().account_id(), common::ACCOUNT_ID);
    session.start_keepalive();
    session.start_keepalive();

    let exit = timeout(Duration::from_secs(5), session.close()).await.unwrap();
    assert_eq!(exit, Some(KeepaliveExit::Cancelled { sent: 0 }));
}

#[tokio::test]
async fn token_failure_stops_before_connecting() {
    let (_oauth, oauth_base) = common::mock_oauth(200, r#"{"error":"invalid_client"}"#).await;
    let stream = common::spawn_stream(Vec::new(), Duration::from_millis(10)).await;

    let err = run_session(&config(&oauth_base, &stream.base_url), &Dispatcher::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Auth(_)), "got {err:?}");
    assert!(stream.log.queries().is_empty());
}

#[tokio::test]
async fn unreachable_stream_is_connect_error() {
    let (_oauth, oauth_base) = common::mock_oauth(200, r#"{"access_token":"abc"}"#).await;
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = run_session(
        &config(&oauth_base, &format!("ws://{}/ws?subscriptionId=sub-1", addr)),
        &Dispatcher::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SessionError::Connect(_)), "got {err:?}");
}
