//! End-to-end session tests against an in-process STOMP broker over a real
//! WebSocket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use retroquest_sync::bus::{Buses, OutgoingAction};
use retroquest_sync::credentials::{CookieJar, StaticToken};
use retroquest_sync::items::{Thought, ThoughtChanges, Topic};
use retroquest_sync::lifecycle::{LifecycleEvent, SyncSession};
use retroquest_sync::realtime::ConnectionState;
use retroquest_sync::stomp::{Command, Frame};
use retroquest_sync::store;
use retroquest_sync::urls::ServerUrls;

const WAIT: Duration = Duration::from_secs(5);

/// Frames the broker saw from the client, in arrival order.
type Seen = Vec<Frame>;

async fn next_frame(ws: &mut WebSocketStream<TcpStream>) -> Option<Frame> {
    while let Some(msg) = ws.next().await {
        match msg.ok()? {
            Message::Text(text) => {
                if let Ok(Some(frame)) = Frame::decode(text.as_str()) {
                    return Some(frame);
                }
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn push(ws: &mut WebSocketStream<TcpStream>, frame: Frame) {
    ws.send(Message::text(frame.encode())).await.unwrap();
}

/// Accept one client: answer CONNECT, wait for four SUBSCRIBEs, push
/// `pushed` on the thoughts topic, then record everything until the socket
/// closes.
async fn serve_one(listener: &TcpListener, pushed: Option<String>) -> Seen {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    let mut seen = Vec::new();

    let connect = next_frame(&mut ws).await.unwrap();
    assert_eq!(connect.command, Command::Connect);
    seen.push(connect);
    push(&mut ws, Frame::new(Command::Connected).with_header("version", "1.2")).await;

    let mut topics = Vec::new();
    while topics.len() < 4 {
        let frame = next_frame(&mut ws).await.unwrap();
        if frame.command == Command::Subscribe {
            topics.push(frame.header("destination").unwrap_or_default().to_string());
        }
        seen.push(frame);
    }

    if let Some(body) = pushed {
        let message = Frame::new(Command::Message)
            .with_header("destination", topics[0].as_str())
            .with_header("subscription", "sub-0")
            .with_header("message-id", "m-1")
            .with_body(body);
        push(&mut ws, message).await;
    }

    while let Some(frame) = next_frame(&mut ws).await {
        let done = frame.command == Command::Disconnect;
        seen.push(frame);
        if done {
            break;
        }
    }
    seen
}

async fn start_broker(pushed: Option<String>) -> (ServerUrls, JoinHandle<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let urls = ServerUrls::new(&format!("http://{}", addr));
    (urls, tokio::spawn(async move { serve_one(&listener, pushed).await }))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_session_round_trip() {
    let put = r#"{"type":"put","payload":{"id":8,"message":"ship it","hearts":2,"topic":"sad","discussed":false,"teamId":"the-avengers"}}"#;
    let (urls, broker) = start_broker(Some(put.to_string())).await;

    let jar = CookieJar::new();
    jar.set_team_token(&urls, "The Avengers", "secret");

    let buses = Buses::new();
    let (thoughts, _tracking) = store::track(&buses.thoughts);
    let session = SyncSession::open(urls, Arc::new(jar), buses.clone());

    session.handle(LifecycleEvent::LoggedIn {
        team: "The Avengers".into(),
    });
    wait_until(|| session.state() == ConnectionState::Connected).await;
    wait_until(|| thoughts.lock().unwrap().get(8).is_some()).await;

    let received = thoughts.lock().unwrap().get(8).cloned().unwrap();
    assert_eq!(received.message, "ship it");
    assert_eq!(received.topic, Topic::Sad);

    let edited = received.with_changes(ThoughtChanges {
        discussed: Some(true),
        ..Default::default()
    });
    buses.thoughts.publish_outgoing(Some(&edited), OutgoingAction::Edit);

    session.handle(LifecycleEvent::LoggedOut);
    wait_until(|| session.state() == ConnectionState::Disconnected).await;

    let seen = tokio::time::timeout(WAIT, broker).await.unwrap().unwrap();

    assert_eq!(seen[0].header("Authorization"), Some("secret"));
    assert_eq!(seen[0].header("host"), Some("127.0.0.1"));

    let topics: Vec<_> = seen
        .iter()
        .filter(|f| f.command == Command::Subscribe)
        .filter_map(|f| f.header("destination"))
        .collect();
    assert_eq!(
        topics,
        vec![
            "/topic/the-avengers/thoughts",
            "/topic/the-avengers/action-items",
            "/topic/the-avengers/column-titles",
            "/topic/heartbeat/pong",
        ]
    );

    let send = seen
        .iter()
        .find(|f| f.command == Command::Send)
        .expect("edit was not sent");
    assert_eq!(send.header("destination"), Some("/app/the-avengers/thought/8/edit"));
    assert_eq!(send.header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_str(&send.body).unwrap();
    assert_eq!(body["id"], 8);
    assert_eq!(body["discussed"], true);

    assert_eq!(seen.last().map(|f| f.command), Some(Command::Disconnect));
}

#[tokio::test]
async fn test_server_delete_removes_item() {
    let delete = r#"{"type":"delete","payload":{"id":3}}"#;
    let (urls, broker) = start_broker(Some(delete.to_string())).await;

    let buses = Buses::new();
    let (thoughts, _tracking) = store::track(&buses.thoughts);
    buses
        .thoughts
        .publish_incoming(Some(&Thought::new(3, "old", 0, Topic::Happy, false, "team")));
    assert_eq!(thoughts.lock().unwrap().len(), 1);

    let session = SyncSession::open(urls, Arc::new(StaticToken(Some("tok".into()))), buses.clone());
    session.handle(LifecycleEvent::LoggedIn { team: "team".into() });

    wait_until(|| thoughts.lock().unwrap().is_empty()).await;

    session.handle(LifecycleEvent::LoggedOut);
    let seen = tokio::time::timeout(WAIT, broker).await.unwrap().unwrap();
    assert_eq!(seen[0].header("Authorization"), Some("tok"));
}

#[tokio::test]
async fn test_background_and_foreground_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let urls = ServerUrls::new(&format!("http://{}", addr));

    let broker = tokio::spawn(async move {
        let first = serve_one(&listener, None).await;
        let second = serve_one(&listener, None).await;
        (first, second)
    });

    let session = SyncSession::open(urls, Arc::new(StaticToken(Some("tok".into()))), Buses::new());
    session.handle(LifecycleEvent::LoggedIn { team: "team".into() });
    wait_until(|| session.state() == ConnectionState::Connected).await;

    session.handle(LifecycleEvent::WillResignActive);
    wait_until(|| session.state() == ConnectionState::Disconnected).await;
    assert!(session.is_logged_in());

    session.handle(LifecycleEvent::DidBecomeActive);
    wait_until(|| session.state() == ConnectionState::Connected).await;

    session.handle(LifecycleEvent::LoggedOut);
    let (first, second) = tokio::time::timeout(WAIT, broker).await.unwrap().unwrap();

    // CONNECT, four SUBSCRIBEs, DISCONNECT
    assert_eq!(first.len(), 6);
    assert_eq!(second.len(), 6);
    assert_eq!(second[0].header("Authorization"), Some("tok"));
}

#[tokio::test]
async fn test_foreground_before_close_completes_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let urls = ServerUrls::new(&format!("http://{}", addr));

    let broker = tokio::spawn(async move {
        let first = serve_one(&listener, None).await;
        let second = serve_one(&listener, None).await;
        (first, second)
    });

    let session = SyncSession::open(urls, Arc::new(StaticToken(Some("tok".into()))), Buses::new());
    session.handle(LifecycleEvent::LoggedIn { team: "team".into() });
    wait_until(|| session.state() == ConnectionState::Connected).await;

    session.handle(LifecycleEvent::WillResignActive);
    session.handle(LifecycleEvent::DidBecomeActive);
    wait_until(|| !session.adapter().is_closing() && session.state() == ConnectionState::Connected).await;

    session.handle(LifecycleEvent::LoggedOut);
    let (first, second) = tokio::time::timeout(WAIT, broker).await.unwrap().unwrap();

    assert_eq!(first.last().map(|f| f.command), Some(Command::Disconnect));
    assert_eq!(second[0].command, Command::Connect);
    assert_eq!(second.len(), 6);
}

#[tokio::test]
async fn test_unreachable_server_falls_back_to_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let urls = ServerUrls::new(&format!("http://{}", addr));
    let session = SyncSession::open(urls, Arc::new(StaticToken(Some("tok".into()))), Buses::new());
    session.handle(LifecycleEvent::LoggedIn { team: "team".into() });

    wait_until(|| session.state() == ConnectionState::Disconnected).await;
    assert!(session.is_logged_in());
}

#[tokio::test]
async fn test_missing_token_never_dials() {
    let (urls, broker) = start_broker(None).await;
    let session = SyncSession::open(urls, Arc::new(StaticToken(None)), Buses::new());
    session.handle(LifecycleEvent::LoggedIn { team: "team".into() });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(!broker.is_finished());
    broker.abort();
}
