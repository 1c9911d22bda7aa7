//! STOMP-over-WebSocket plumbing.
//!
//! ## Module Map
//!
//! | Module    | Responsibility                                            |
//! |-----------|-----------------------------------------------------------|
//! | `frame`   | `Frame` / `Command` codec (STOMP 1.2 text frames)         |
//! | `session` | `StompSession`, the tokio-tungstenite client socket task  |
//!
//! The realtime adapter only talks to a [`StompTransport`]. Every call on it
//! is fire-and-forget; outcomes come back later as [`SessionEvent`]s that the
//! owner feeds into the adapter one at a time.

pub mod frame;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;

pub use frame::{Command, Frame};
pub use session::StompSession;

/// Callbacks raised by a transport session, delivered serially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The broker answered CONNECT with CONNECTED.
    Connected,
    /// The socket closed, failed to open, or was disconnected on request.
    Disconnected,
    Message { destination: String, body: String },
    Receipt(String),
    Error(String),
}

/// Client side of a STOMP session.
pub trait StompTransport: Send + Sync + 'static {
    /// Start opening a session; `headers` go on both the HTTP upgrade and CONNECT.
    fn open(&self, url: &str, headers: &[(&str, &str)]);

    fn is_connected(&self) -> bool;

    fn subscribe(&self, destination: &str);

    fn send(&self, destination: &str, body: &str, headers: &[(&str, &str)]);

    fn disconnect(&self);
}
