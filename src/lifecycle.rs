//! Session lifecycle glue.
//!
//! [`SyncSession`] ties the realtime session to login state and app
//! foreground/background transitions. Login connects, going to the
//! background disconnects, and logout tears down every subscriber and ignores
//! foreground changes until the next login. Coming back to the foreground
//! reloads thoughts and action items over HTTP, when an [`ItemsService`] is
//! attached, then reconnects.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::Buses;
use crate::credentials::TokenStore;
use crate::fetch::ItemsService;
use crate::items::{ActionItem, Thought};
use crate::realtime::{ConnectionState, RealtimeAdapter};
use crate::stomp::{StompSession, StompTransport};
use crate::urls::ServerUrls;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    LoggedIn { team: String },
    DidBecomeActive,
    WillResignActive,
    LoggedOut,
}

pub struct SyncSession<T: StompTransport> {
    adapter: RealtimeAdapter<T>,
    items: Option<Arc<ItemsService>>,
    logged_in: AtomicBool,
    event_loop: Option<JoinHandle<()>>,
}

impl SyncSession<StompSession> {
    /// Session over a real WebSocket. Must be called inside a tokio runtime;
    /// the event loop is spawned immediately.
    pub fn open(urls: ServerUrls, tokens: Arc<dyn TokenStore>, buses: Buses) -> Self {
        let (transport, events) = StompSession::channel();
        let adapter = RealtimeAdapter::new(Arc::new(transport), buses, tokens, urls);
        let event_loop = adapter.spawn_event_loop(events);
        Self {
            adapter,
            items: None,
            logged_in: AtomicBool::new(false),
            event_loop: Some(event_loop),
        }
    }
}

impl<T: StompTransport> SyncSession<T> {
    /// Wrap an adapter whose session events are delivered by the caller.
    pub fn with_adapter(adapter: RealtimeAdapter<T>) -> Self {
        Self {
            adapter,
            items: None,
            logged_in: AtomicBool::new(false),
            event_loop: None,
        }
    }

    /// Reload thoughts and action items through `items` whenever the app
    /// comes back to the foreground.
    pub fn with_items(mut self, items: Arc<ItemsService>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn adapter(&self) -> &RealtimeAdapter<T> {
        &self.adapter
    }

    pub fn buses(&self) -> &Buses {
        self.adapter.buses()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ConnectionState {
        self.adapter.state()
    }

    pub fn handle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::LoggedIn { team } => {
                info!(team = %team, "Logged in");
                let previous = self.adapter.team();
                self.adapter.set_team(team);
                self.logged_in.store(true, Ordering::SeqCst);
                let team_changed = previous != self.adapter.team();
                if team_changed && self.adapter.state() != ConnectionState::Disconnected {
                    info!(previous = %previous, "Team changed, restarting realtime session");
                    self.adapter.disconnect();
                }
                self.adapter.connect();
            }
            LifecycleEvent::DidBecomeActive => {
                if self.is_logged_in() {
                    self.refresh_items();
                    self.adapter.connect();
                } else {
                    debug!("Became active while logged out, ignoring");
                }
            }
            LifecycleEvent::WillResignActive => {
                if self.is_logged_in() {
                    self.adapter.disconnect();
                }
            }
            LifecycleEvent::LoggedOut => {
                info!("Logged out");
                self.logged_in.store(false, Ordering::SeqCst);
                self.adapter.disconnect();
                self.adapter.buses().clear_all_subscribers();
            }
        }
    }
}

impl<T: StompTransport> SyncSession<T> {
    /// Spawn a reload of thoughts then action items for the current team.
    fn refresh_items(&self) {
        let Some(items) = self.items.clone() else {
            return;
        };
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime, skipping foreground refresh");
                return;
            }
        };
        let team = self.adapter.team();
        runtime.spawn(async move {
            if let Err(e) = items.refresh::<Thought>(&team).await {
                warn!(team = %team, error = %e, "Foreground refresh of thoughts failed");
            }
            if let Err(e) = items.refresh::<ActionItem>(&team).await {
                warn!(team = %team, error = %e, "Foreground refresh of action items failed");
            }
        });
    }
}

impl<T: StompTransport> Drop for SyncSession<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticToken;
    use crate::fetch::mock::MockFetcher;
    use crate::items::ItemKind;
    use crate::stomp::SessionEvent;
    use std::sync::Mutex;
    use std::time::Duration;
    use crate::stomp::fake::FakeTransport;

    fn session() -> (SyncSession<FakeTransport>, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::default());
        let adapter = RealtimeAdapter::new(
            Arc::clone(&transport),
            Buses::new(),
            Arc::new(StaticToken(Some("tok".into()))),
            ServerUrls::new("https://retro.io"),
        );
        (SyncSession::with_adapter(adapter), transport)
    }

    /// Play the transport's side of a successful connect.
    fn broker_accepts(session: &SyncSession<FakeTransport>, transport: &FakeTransport) {
        transport.connected.store(true, Ordering::SeqCst);
        session.adapter().handle_event(SessionEvent::Connected);
    }

    fn broker_drops(session: &SyncSession<FakeTransport>, transport: &FakeTransport) {
        transport.connected.store(false, Ordering::SeqCst);
        session.adapter().handle_event(SessionEvent::Disconnected);
    }

    #[test]
    fn test_login_connects_for_team() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::LoggedIn {
            team: "The Avengers".into(),
        });

        assert!(session.is_logged_in());
        assert_eq!(session.adapter().team(), "The Avengers");
        let opened = transport.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].0, "wss://retro.io/websocket/websocket");
    }

    #[test]
    fn test_background_and_foreground_cycle() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::LoggedIn { team: "t".into() });
        broker_accepts(&session, &transport);

        session.handle(LifecycleEvent::WillResignActive);
        assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
        broker_drops(&session, &transport);
        assert_eq!(session.state(), ConnectionState::Disconnected);

        session.handle(LifecycleEvent::DidBecomeActive);
        assert_eq!(transport.opened.lock().unwrap().len(), 2);
        assert_eq!(session.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_logout_clears_subscribers_and_ignores_foreground() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::LoggedIn { team: "t".into() });
        broker_accepts(&session, &transport);
        session.buses().thoughts.subscribe_incoming(|_| {});
        session.buses().columns.subscribe_incoming(|_| {});

        session.handle(LifecycleEvent::LoggedOut);
        broker_drops(&session, &transport);

        assert!(!session.is_logged_in());
        assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(session.buses().thoughts.incoming_count(), 0);
        assert_eq!(session.buses().columns.incoming_count(), 0);
        assert_eq!(session.buses().action_items.outgoing_count(), 0);

        session.handle(LifecycleEvent::DidBecomeActive);
        session.handle(LifecycleEvent::WillResignActive);
        assert_eq!(transport.opened.lock().unwrap().len(), 1);
        assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_foreground_while_closing_reconnects_once_closed() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::LoggedIn { team: "t".into() });
        broker_accepts(&session, &transport);

        session.handle(LifecycleEvent::WillResignActive);
        session.handle(LifecycleEvent::DidBecomeActive);
        assert_eq!(transport.opened.lock().unwrap().len(), 1);

        broker_drops(&session, &transport);

        assert!(session.is_logged_in());
        assert_eq!(transport.opened.lock().unwrap().len(), 2);
        assert_eq!(session.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_background_again_before_close_stays_down() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::LoggedIn { team: "t".into() });
        broker_accepts(&session, &transport);

        session.handle(LifecycleEvent::WillResignActive);
        session.handle(LifecycleEvent::DidBecomeActive);
        session.handle(LifecycleEvent::WillResignActive);
        broker_drops(&session, &transport);

        assert_eq!(transport.opened.lock().unwrap().len(), 1);
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_logout_while_closing_does_not_reconnect() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::LoggedIn { team: "t".into() });
        broker_accepts(&session, &transport);

        session.handle(LifecycleEvent::WillResignActive);
        session.handle(LifecycleEvent::DidBecomeActive);
        session.handle(LifecycleEvent::LoggedOut);
        broker_drops(&session, &transport);

        assert_eq!(transport.opened.lock().unwrap().len(), 1);
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_login_to_other_team_restarts_session() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::LoggedIn { team: "Team A".into() });
        broker_accepts(&session, &transport);

        session.handle(LifecycleEvent::LoggedIn { team: "Team B".into() });
        assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(transport.opened.lock().unwrap().len(), 1);

        broker_drops(&session, &transport);
        assert_eq!(transport.opened.lock().unwrap().len(), 2);

        broker_accepts(&session, &transport);
        let subscribed = transport.subscribed.lock().unwrap();
        assert_eq!(subscribed[4], "/topic/team-b/thoughts");
        assert_eq!(subscribed[5], "/topic/team-b/action-items");
    }

    #[test]
    fn test_login_to_same_team_keeps_session() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::LoggedIn { team: "t".into() });
        broker_accepts(&session, &transport);

        session.handle(LifecycleEvent::LoggedIn { team: "t".into() });

        assert_eq!(transport.disconnects.load(Ordering::SeqCst), 0);
        assert_eq!(transport.opened.lock().unwrap().len(), 1);
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_foreground_refreshes_thoughts_and_action_items() {
        let fetcher = Arc::new(MockFetcher::new(vec![(
            ItemKind::Thought,
            Ok(r#"[{"id":4,"message":"m","hearts":0,"topic":"happy","discussed":false,"teamId":"t"}]"#),
        )]));
        let (session, transport) = session();
        let items = Arc::new(ItemsService::new(fetcher.clone(), session.buses().clone()));
        let session = session.with_items(items);
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            session
                .buses()
                .thoughts
                .subscribe_incoming(move |t| seen.lock().unwrap().push(t.map(|t| t.id)));
        }

        session.handle(LifecycleEvent::DidBecomeActive);
        session.handle(LifecycleEvent::LoggedIn { team: "My Team".into() });
        assert!(fetcher.calls.lock().unwrap().is_empty());

        broker_accepts(&session, &transport);
        session.handle(LifecycleEvent::WillResignActive);
        broker_drops(&session, &transport);
        session.handle(LifecycleEvent::DidBecomeActive);
        assert_eq!(transport.opened.lock().unwrap().len(), 2);

        tokio::time::timeout(Duration::from_secs(5), async {
            while fetcher.calls.lock().unwrap().len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            *fetcher.calls.lock().unwrap(),
            vec![
                ("My Team".to_string(), ItemKind::Thought),
                ("My Team".to_string(), ItemKind::ActionItem),
            ]
        );
        assert_eq!(*seen.lock().unwrap(), vec![Some(4)]);
    }

    #[test]
    fn test_foreground_before_login_is_ignored() {
        let (session, transport) = session();
        session.handle(LifecycleEvent::DidBecomeActive);
        assert!(transport.opened.lock().unwrap().is_empty());
    }
}
