//! In-memory connector for driving the connection in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use super::transport::{
    ChannelEvent, ChannelLink, Connector, DisconnectReason, Frame, TransportError,
};

/// The server end of one accepted connection.
pub(crate) struct MockServer {
    pub outbound: UnboundedReceiver<Frame>,
    pub inbound: UnboundedSender<ChannelEvent>,
}

impl MockServer {
    pub fn push(&self, event: &str, data: Value) {
        self.inbound
            .send(ChannelEvent::Frame(Frame::new(event, data)))
            .unwrap();
    }

    pub fn close(&self, reason: DisconnectReason) {
        self.inbound.send(ChannelEvent::Closed(reason)).unwrap();
    }
}

#[derive(Clone)]
pub(crate) struct MockConnector {
    refuse: Arc<AtomicBool>,
    attempts: Arc<Mutex<Vec<Instant>>>,
    servers: UnboundedSender<MockServer>,
}

impl MockConnector {
    /// Returns the connector and a receiver yielding one [`MockServer`] per
    /// accepted connection.
    pub fn new(refuse: bool) -> (Self, UnboundedReceiver<MockServer>) {
        let (servers_tx, servers_rx) = mpsc::unbounded_channel();
        let connector = Self {
            refuse: Arc::new(AtomicBool::new(refuse)),
            attempts: Arc::new(Mutex::new(Vec::new())),
            servers: servers_tx,
        };
        (connector, servers_rx)
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Times of every connection attempt, accepted or not.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    fn connect(&self) -> BoxFuture<'static, Result<ChannelLink, TransportError>> {
        self.attempts.lock().unwrap().push(Instant::now());
        let result = if self.refuse.load(Ordering::SeqCst) {
            Err(TransportError::Refused("mock server is down".to_string()))
        } else {
            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let _ = self.servers.send(MockServer {
                outbound: outbound_rx,
                inbound: inbound_tx,
            });
            Ok(ChannelLink {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        };
        Box::pin(std::future::ready(result))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
