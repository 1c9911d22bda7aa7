use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tracing::{debug, info, warn};

use super::frame::{Command, Frame};
use super::{SessionEvent, StompTransport};

enum Outbound {
    Frame(Frame),
    Close,
}

/// STOMP client over a tokio-tungstenite socket.
///
/// Each `open` spawns one socket task on the current tokio runtime. The task
/// owns the socket and runs a single select loop over queued outbound frames
/// and inbound messages; it reports back through the event channel handed to
/// [`StompSession::new`] and always ends with exactly one
/// [`SessionEvent::Disconnected`].
pub struct StompSession {
    events: mpsc::UnboundedSender<SessionEvent>,
    connected: Arc<AtomicBool>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    next_subscription: AtomicU64,
}

impl StompSession {
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            connected: Arc::new(AtomicBool::new(false)),
            outbound: Mutex::new(None),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Convenience constructor returning the event receiver alongside.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn enqueue(&self, item: Outbound) -> bool {
        let guard = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx.send(item).is_ok(),
            None => false,
        }
    }
}

impl StompTransport for StompSession {
    fn open(&self, url: &str, headers: &[(&str, &str)]) {
        let mut outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        if outbound.as_ref().is_some_and(|tx| !tx.is_closed()) {
            debug!(url, "STOMP session already open");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Cannot open STOMP session outside a tokio runtime");
                let _ = self.events.send(SessionEvent::Disconnected);
                return;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        *outbound = Some(tx);
        self.connected.store(false, Ordering::SeqCst);

        let headers: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        runtime.spawn(run_socket(
            url.to_string(),
            headers,
            rx,
            self.events.clone(),
            Arc::clone(&self.connected),
        ));
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self, destination: &str) {
        let id = format!("sub-{}", self.next_subscription.fetch_add(1, Ordering::SeqCst));
        if !self.enqueue(Outbound::Frame(Frame::subscribe(&id, destination))) {
            debug!(destination, "Dropping SUBSCRIBE, session not open");
        }
    }

    fn send(&self, destination: &str, body: &str, headers: &[(&str, &str)]) {
        if !self.enqueue(Outbound::Frame(Frame::send(destination, body, headers))) {
            debug!(destination, "Dropping SEND, session not open");
        }
    }

    fn disconnect(&self) {
        self.enqueue(Outbound::Close);
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

fn build_request(url: &str, headers: &[(String, String)]) -> Result<Request> {
    let mut request = url
        .into_client_request()
        .with_context(|| format!("Invalid WebSocket URL: {}", url))?;
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .with_context(|| format!("Invalid header name: {}", key))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {}", key))?;
        request.headers_mut().insert(name, value);
    }
    Ok(request)
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Socket task. Whatever happens inside, the outbound receiver is dropped
/// before the single `Disconnected` event goes out, so a reopen triggered by
/// that event never sees a stale sender.
async fn run_socket(
    url: String,
    headers: Vec<(String, String)>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<SessionEvent>,
    connected: Arc<AtomicBool>,
) {
    if let Err(e) = pump(&url, &headers, outbound, &events, &connected).await {
        warn!(url = %url, error = %e, "STOMP session failed");
    }
    connected.store(false, Ordering::SeqCst);
    info!(url = %url, "STOMP session closed");
    let _ = events.send(SessionEvent::Disconnected);
}

/// Connect, send CONNECT, then move frames both ways until the socket closes
/// or a close is requested.
async fn pump(
    url: &str,
    headers: &[(String, String)],
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: &mpsc::UnboundedSender<SessionEvent>,
    connected: &AtomicBool,
) -> Result<()> {
    let request = build_request(url, headers)?;
    let (socket, _response) = tokio_tungstenite::connect_async(request)
        .await
        .with_context(|| format!("WebSocket connect to {} failed", url))?;
    debug!(url, "WebSocket open, sending CONNECT");

    let (mut sink, mut stream) = socket.split();
    let extra: Vec<(&str, &str)> = headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let connect = Frame::connect(&host_of(url), &extra);
    sink.send(Message::text(connect.encode()))
        .await
        .context("Failed to send CONNECT")?;

    loop {
        tokio::select! {
            // ── Outbound frames ─────────────────────────────────────────
            item = outbound.recv() => {
                match item {
                    Some(Outbound::Frame(frame)) => {
                        sink.send(Message::text(frame.encode()))
                            .await
                            .with_context(|| format!("Failed to send {}", frame.command))?;
                    }
                    Some(Outbound::Close) | None => {
                        let _ = sink.send(Message::text(Frame::disconnect().encode())).await;
                        let _ = sink.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
            }

            // ── Inbound messages ────────────────────────────────────────
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_inbound(text.as_str(), events, connected),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => handle_inbound(text, events, connected),
                        Err(_) => warn!("Dropping non UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {
                        // ping/pong handled by tungstenite
                    }
                    Some(Err(e)) => return Err(e).context("WebSocket read failed"),
                }
            }
        }
    }
}

fn handle_inbound(text: &str, events: &mpsc::UnboundedSender<SessionEvent>, connected: &AtomicBool) {
    let frame = match Frame::decode(text) {
        Ok(Some(frame)) => frame,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "Dropping undecodable STOMP frame");
            return;
        }
    };

    let event = match frame.command {
        Command::Connected => {
            connected.store(true, Ordering::SeqCst);
            SessionEvent::Connected
        }
        Command::Message => SessionEvent::Message {
            destination: frame.header("destination").unwrap_or_default().to_string(),
            body: frame.body,
        },
        Command::Receipt => {
            SessionEvent::Receipt(frame.header("receipt-id").unwrap_or_default().to_string())
        }
        Command::Error => {
            let message = frame
                .header("message")
                .map(str::to_string)
                .unwrap_or_else(|| frame.body.clone());
            SessionEvent::Error(message)
        }
        other => {
            debug!(command = %other, "Ignoring unexpected frame from server");
            return;
        }
    };
    let _ = events.send(event);
}
