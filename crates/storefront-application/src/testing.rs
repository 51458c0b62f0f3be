//! In-memory channel transport for unit tests.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use storefront_core::channel::{ChannelConnection, ChannelTransport, TransportEvent};
use storefront_core::error::ChannelError;
use storefront_core::session::Credentials;

type Inbound = Result<TransportEvent, ChannelError>;

/// Hands each accepted connection to the test as a [`ServerEnd`].
#[derive(Clone)]
pub struct FakeTransport {
    accepted_tx: mpsc::UnboundedSender<ServerEnd>,
    accepted_rx: Arc<Mutex<mpsc::UnboundedReceiver<ServerEnd>>>,
    connects: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new() -> Self {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        Self {
            accepted_tx,
            accepted_rx: Arc::new(Mutex::new(accepted_rx)),
            connects: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes the next `n` handshakes fail.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Handshakes attempted so far, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub async fn accept(&self) -> ServerEnd {
        self.accepted_rx
            .lock()
            .await
            .recv()
            .await
            .expect("transport dropped")
    }

    pub fn try_accept(&self) -> Option<ServerEnd> {
        self.accepted_rx.try_lock().ok()?.try_recv().ok()
    }
}

#[async_trait]
impl ChannelTransport for FakeTransport {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ChannelConnection>, ChannelError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ChannelError::Handshake("refused".to_string()));
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let server = ServerEnd {
            token: credentials.token().to_string(),
            opened_at: Instant::now(),
            inbound: inbound_tx,
            sent: sent_rx,
            closed: Arc::clone(&closed),
        };
        let _ = self.accepted_tx.send(server);
        Ok(Box::new(FakeConnection {
            inbound: inbound_rx,
            sent: sent_tx,
            closed,
        }))
    }
}

/// The test's side of one fake connection.
pub struct ServerEnd {
    pub token: String,
    pub opened_at: Instant,
    inbound: mpsc::UnboundedSender<Inbound>,
    sent: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl ServerEnd {
    pub fn push_text(&self, text: &str) {
        let _ = self.inbound.send(Ok(TransportEvent::Text(text.to_string())));
    }

    pub fn push_close(&self, code: u16, reason: &str) {
        let _ = self.inbound.send(Ok(TransportEvent::Closed {
            code: Some(code),
            reason: reason.to_string(),
        }));
    }

    pub fn push_error(&self, error: ChannelError) {
        let _ = self.inbound.send(Err(error));
    }

    /// Next frame the client sent.
    pub async fn next_sent(&mut self) -> String {
        self.sent.recv().await.expect("connection dropped")
    }

    pub fn try_next_sent(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }

    /// Whether the client closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeConnection {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl ChannelConnection for FakeConnection {
    async fn recv(&mut self) -> Result<TransportEvent, ChannelError> {
        match self.inbound.recv().await {
            Some(event) => event,
            None => Ok(TransportEvent::Closed {
                code: None,
                reason: "server end dropped".to_string(),
            }),
        }
    }

    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.sent
            .send(text)
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
