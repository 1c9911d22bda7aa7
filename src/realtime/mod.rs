//! Realtime transport adapter.
//!
//! Bridges the three [`Buses`] and a [`StompTransport`]. After the broker
//! confirms the session the adapter subscribes the team topics, forwards
//! outgoing bus traffic as SEND frames, republishes server pushes on the
//! incoming side, and pings the heartbeat endpoint once a minute. On
//! disconnect it drops every outgoing subscriber and stops the heartbeat.
//! It never reconnects on its own and never queues sends.
//!
//! Session callbacks arrive as [`SessionEvent`]s and must be handed to
//! [`RealtimeAdapter::handle_event`] one at a time, usually through
//! [`RealtimeAdapter::spawn_event_loop`].

pub mod inbound;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{BusItem, Buses, OutgoingAction, Subscription};
use crate::credentials::TokenStore;
use crate::destination::{Destinations, HEARTBEAT_PING};
use crate::errors::SyncError;
use crate::items::{ActionItem, Column, Thought};
use crate::stomp::{SessionEvent, StompTransport};
use crate::urls::ServerUrls;

pub use inbound::decode_incoming;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

const JSON_CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Team and paths fixed when the broker confirmed the session.
#[derive(Clone)]
struct LiveSession {
    team: String,
    destinations: Destinations,
}

struct AdapterState {
    connection: ConnectionState,
    team: String,
    /// `None` until CONNECTED arrives.
    live: Option<LiveSession>,
    /// A close was requested and its `Disconnected` event has not landed yet.
    closing: bool,
    /// `connect` was called while closing; reopen once the close lands.
    reconnect_pending: bool,
    heartbeat: Option<JoinHandle<()>>,
    outgoing: Vec<Subscription>,
}

struct AdapterInner<T> {
    transport: Arc<T>,
    buses: Buses,
    tokens: Arc<dyn TokenStore>,
    urls: ServerUrls,
    state: Mutex<AdapterState>,
}

/// Handle to the adapter. Clones share one session.
pub struct RealtimeAdapter<T: StompTransport> {
    inner: Arc<AdapterInner<T>>,
}

impl<T: StompTransport> Clone for RealtimeAdapter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: StompTransport> RealtimeAdapter<T> {
    pub fn new(transport: Arc<T>, buses: Buses, tokens: Arc<dyn TokenStore>, urls: ServerUrls) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                transport,
                buses,
                tokens,
                urls,
                state: Mutex::new(AdapterState {
                    connection: ConnectionState::Disconnected,
                    team: String::new(),
                    live: None,
                    closing: false,
                    reconnect_pending: false,
                    heartbeat: None,
                    outgoing: Vec::new(),
                }),
            }),
        }
    }

    fn from_inner(inner: Arc<AdapterInner<T>>) -> Self {
        Self { inner }
    }

    fn lock(&self) -> MutexGuard<'_, AdapterState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn buses(&self) -> &Buses {
        &self.inner.buses
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.inner.transport
    }

    /// Team used for the next session, exactly as the user entered it.
    pub fn set_team(&self, team: impl Into<String>) {
        self.lock().team = team.into();
    }

    pub fn team(&self) -> String {
        self.lock().team.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().connection
    }

    pub fn heartbeat_running(&self) -> bool {
        self.lock()
            .heartbeat
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Open a session for the current team if one is not already open or
    /// opening. Without a stored token nothing happens. While a close is in
    /// flight the open is deferred until that close completes.
    pub fn connect(&self) {
        let team = {
            let mut state = self.lock();
            if state.connection != ConnectionState::Disconnected {
                if state.closing {
                    debug!("Realtime session closing, reconnecting once closed");
                    state.reconnect_pending = true;
                } else {
                    debug!(state = %state.connection, "Realtime session already active");
                }
                return;
            }
            state.team.clone()
        };

        let team_url = self.inner.urls.team(&team);
        let Some(token) = self.inner.tokens.token_for(&team_url) else {
            warn!(team = %team, "No token stored for team, not connecting");
            return;
        };

        {
            let mut state = self.lock();
            if state.connection != ConnectionState::Disconnected {
                return;
            }
            state.connection = ConnectionState::Connecting;
        }

        let url = self.inner.urls.websocket();
        info!(url = %url, team = %team, "Opening realtime session");
        self.inner
            .transport
            .open(&url, &[("Authorization", token.as_str())]);
    }

    /// Ask the transport to close. Cleanup happens when its `Disconnected`
    /// event comes back; calling this again meanwhile is harmless. Cancels a
    /// reconnect deferred by an earlier [`connect`](Self::connect).
    pub fn disconnect(&self) {
        let state = {
            let mut state = self.lock();
            state.reconnect_pending = false;
            if state.connection == ConnectionState::Disconnected
                && !self.inner.transport.is_connected()
            {
                debug!("Realtime session already closed");
                return;
            }
            state.closing = true;
            state.connection
        };
        info!(state = %state, "Closing realtime session");
        self.inner.transport.disconnect();
    }

    /// True between a requested close and its `Disconnected` event.
    pub fn is_closing(&self) -> bool {
        self.lock().closing
    }

    /// Empty SEND to the ping endpoint, skipped when not connected.
    pub fn send_heartbeat(&self) {
        if !self.inner.transport.is_connected() {
            debug!("Skipping heartbeat, not connected");
            return;
        }
        self.inner.transport.send(HEARTBEAT_PING, "", &[]);
    }

    pub fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Connected => self.on_connected(),
            SessionEvent::Disconnected => self.on_disconnected(),
            SessionEvent::Message { destination, body } => self.on_message(&destination, &body),
            SessionEvent::Receipt(id) => debug!(receipt = %id, "Receipt from broker"),
            SessionEvent::Error(message) => warn!(message = %message, "Error frame from broker"),
        }
    }

    /// Feed session events into [`handle_event`](Self::handle_event) until the
    /// channel closes or the adapter is dropped.
    pub fn spawn_event_loop(&self, mut events: mpsc::UnboundedReceiver<SessionEvent>) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Self::from_inner(inner).handle_event(event);
            }
            debug!("Realtime event loop finished");
        })
    }

    fn on_connected(&self) {
        let (destinations, stale) = {
            let mut state = self.lock();
            let destinations = Destinations::new(&state.team);
            state.connection = ConnectionState::Connected;
            state.live = Some(LiveSession {
                team: state.team.clone(),
                destinations: destinations.clone(),
            });
            (destinations, std::mem::take(&mut state.outgoing))
        };
        for subscription in stale {
            subscription.cancel();
        }
        info!(team = %destinations.team(), "Realtime session connected");

        for topic in destinations.subscriptions() {
            self.inner.transport.subscribe(&topic);
        }

        let outgoing = vec![
            self.forward_outgoing::<Thought>(),
            self.forward_outgoing::<ActionItem>(),
            self.forward_outgoing::<Column>(),
        ];
        let heartbeat = self.spawn_heartbeat();

        let mut state = self.lock();
        state.outgoing = outgoing;
        if let Some(previous) = std::mem::replace(&mut state.heartbeat, heartbeat) {
            previous.abort();
        }
    }

    fn on_disconnected(&self) {
        self.inner.buses.clear_outgoing_subscribers();
        let (heartbeat, reconnect) = {
            let mut state = self.lock();
            state.connection = ConnectionState::Disconnected;
            state.live = None;
            state.closing = false;
            state.outgoing.clear();
            (state.heartbeat.take(), std::mem::take(&mut state.reconnect_pending))
        };
        if let Some(handle) = heartbeat {
            handle.abort();
        }
        info!("Realtime session disconnected");
        if reconnect {
            self.connect();
        }
    }

    fn on_message(&self, destination: &str, body: &str) {
        let live = self.lock().live.clone();
        let Some(LiveSession { team, destinations }) = live else {
            debug!(destination, "Message outside a session, ignoring");
            return;
        };

        if destination == destinations.heartbeat_topic() {
            return;
        } else if destination == destinations.thoughts_topic() {
            self.publish_incoming::<Thought>(body, &team);
        } else if destination == destinations.action_items_topic() {
            self.publish_incoming::<ActionItem>(body, &team);
        } else if destination == destinations.column_titles_topic() {
            self.publish_incoming::<Column>(body, &team);
        } else {
            debug!(destination, "Message for unknown destination, ignoring");
        }
    }

    fn publish_incoming<I: BusItem>(&self, body: &str, team: &str) {
        match decode_incoming::<I>(body, team) {
            Ok(item) => I::bus_of(&self.inner.buses).publish_incoming(Some(&item)),
            Err(e) => warn!(kind = %I::KIND, error = %e, "Dropping inbound message"),
        }
    }

    fn forward_outgoing<I: BusItem>(&self) -> Subscription {
        let weak = Arc::downgrade(&self.inner);
        I::bus_of(&self.inner.buses).subscribe_outgoing(move |item: Option<&I>, action| {
            if let Some(inner) = weak.upgrade() {
                Self::from_inner(inner).send_item(item, action);
            }
        })
    }

    fn send_item<I: BusItem>(&self, item: Option<&I>, action: OutgoingAction) {
        let Some(item) = item else {
            return;
        };
        let destinations = self.lock().live.as_ref().map(|live| live.destinations.clone());
        let Some(destinations) = destinations.filter(|_| self.inner.transport.is_connected()) else {
            debug!(kind = %I::KIND, action = %action, "Not connected, dropping send");
            return;
        };

        let destination = destinations.outgoing(item, action);
        if destination.is_empty() {
            debug!(kind = %I::KIND, action = %action, "No destination for action, skipping");
            return;
        }

        let body = match serde_json::to_string(item) {
            Ok(body) => body,
            Err(source) => {
                let err = SyncError::Encode {
                    kind: I::KIND.as_str(),
                    source,
                };
                warn!(error = %err, "Dropping outgoing item");
                return;
            }
        };
        debug!(destination = %destination, "Sending item");
        self.inner
            .transport
            .send(&destination, &body, &[JSON_CONTENT_TYPE]);
    }

    fn spawn_heartbeat(&self) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime, heartbeat not started");
                return None;
            }
        };
        let weak = Arc::downgrade(&self.inner);
        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                Self::from_inner(inner).send_heartbeat();
            }
        }))
    }
}
