//! WebSocket observer connection state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use pharos_core::ClientId;
use tokio::sync::mpsc;

/// A connected observer.
pub struct ClientConnection {
    /// Caller-chosen connection ID from the channel path.
    pub id: ClientId,
    /// Send channel to the connection's WebSocket write task.
    tx: mpsc::Sender<String>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Count of envelopes dropped because the outbound queue was full.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection around the write task's channel.
    #[must_use]
    pub fn new(id: ClientId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Send a serialized envelope to the observer.
    ///
    /// Returns `false` if the queue is full or closed, and increments the
    /// dropped message counter. A slow observer never blocks the evaluation
    /// loops.
    pub fn send(&self, message: String) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total envelopes dropped for this connection.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(4);
        let conn = ClientConnection::new(ClientId::from("obs-1"), tx);
        (conn, rx)
    }

    #[tokio::test]
    async fn send_delivers_message() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send("hello".into()));
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_to_closed_channel_counts_drop() {
        let (tx, rx) = mpsc::channel(4);
        let conn = ClientConnection::new(ClientId::from("obs-2"), tx);
        drop(rx);
        assert!(!conn.send("hello".into()));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new(ClientId::from("obs-3"), tx);
        assert!(conn.send("first".into()));
        assert!(!conn.send("second".into()));
        assert!(!conn.send("third".into()));
        assert_eq!(conn.drop_count(), 2);
    }

    #[test]
    fn age_increases() {
        let (conn, _rx) = make_connection();
        let first = conn.age();
        std::thread::sleep(Duration::from_millis(5));
        assert!(conn.age() > first);
    }
}
