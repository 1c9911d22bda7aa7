//! Recording transport for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::StompTransport;

pub type Headers = Vec<(String, String)>;

#[derive(Default)]
pub struct FakeTransport {
    pub connected: AtomicBool,
    pub opened: Mutex<Vec<(String, Headers)>>,
    pub subscribed: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<(String, String, Headers)>>,
    pub disconnects: AtomicUsize,
}

fn owned(headers: &[(&str, &str)]) -> Headers {
    headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl StompTransport for FakeTransport {
    fn open(&self, url: &str, headers: &[(&str, &str)]) {
        self.opened.lock().unwrap().push((url.to_string(), owned(headers)));
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self, destination: &str) {
        self.subscribed.lock().unwrap().push(destination.to_string());
    }

    fn send(&self, destination: &str, body: &str, headers: &[(&str, &str)]) {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), body.to_string(), owned(headers)));
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
