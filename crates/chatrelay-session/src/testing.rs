//! Mock transport implementations for unit-testing the state machines
//! without sockets.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chatrelay_transport::{Connection, ConnectionId, Connector};

/// Error type shared by the mock connection and connector.
#[derive(Debug, thiserror::Error)]
#[error("mock transport failure")]
pub(crate) struct MockError;

/// An in-memory [`Connection`] that records sent lines.
#[derive(Clone)]
pub(crate) struct MockConnection {
    id: ConnectionId,
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl MockConnection {
    pub(crate) fn new(raw_id: u64) -> Self {
        Self {
            id: ConnectionId::new(raw_id),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_sends: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A connection whose every send fails.
    pub(crate) fn failing(raw_id: u64) -> Self {
        let conn = Self::new(raw_id);
        conn.fail_sends.store(true, Ordering::Relaxed);
        conn
    }

    /// Makes all subsequent sends fail.
    pub(crate) fn fail_future_sends(&self) {
        self.fail_sends.store(true, Ordering::Relaxed);
    }

    pub(crate) fn sent_lines(&self) -> Vec<String> {
        self.sent.lock().expect("lock").clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

impl Connection for MockConnection {
    type Error = MockError;

    async fn send_line(&self, line: &str) -> Result<(), Self::Error> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(MockError);
        }
        self.sent.lock().expect("lock").push(line.to_string());
        Ok(())
    }

    async fn recv_line(&self) -> Result<Option<String>, Self::Error> {
        Ok(None)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// A [`Connector`] that hands out [`MockConnection`]s, or refuses.
pub(crate) struct MockConnector {
    refuse: Arc<AtomicBool>,
    next_id: Arc<AtomicU64>,
    dialed: Arc<Mutex<Vec<(String, u32)>>>,
    last: Arc<Mutex<Option<MockConnection>>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self {
            refuse: Arc::new(AtomicBool::new(false)),
            next_id: Arc::new(AtomicU64::new(1)),
            dialed: Arc::new(Mutex::new(Vec::new())),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// A connector whose every dial fails.
    pub(crate) fn refusing() -> Self {
        let connector = Self::new();
        connector.refuse.store(true, Ordering::Relaxed);
        connector
    }

    /// The `(host, port)` pairs dialed so far.
    pub(crate) fn dialed(&self) -> Vec<(String, u32)> {
        self.dialed.lock().expect("lock").clone()
    }

    /// The most recently produced connection, if any.
    pub(crate) fn last_connection(&self) -> Option<MockConnection> {
        self.last.lock().expect("lock").clone()
    }
}

impl Connector for MockConnector {
    type Conn = MockConnection;
    type Error = MockError;

    async fn connect(
        &self,
        host: &str,
        port: u32,
    ) -> Result<Self::Conn, Self::Error> {
        self.dialed
            .lock()
            .expect("lock")
            .push((host.to_string(), port));
        if self.refuse.load(Ordering::Relaxed) {
            return Err(MockError);
        }
        let conn =
            MockConnection::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        *self.last.lock().expect("lock") = Some(conn.clone());
        Ok(conn)
    }
}
