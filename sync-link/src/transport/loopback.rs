//! In-process transport pair.
//!
//! Two [`LoopbackTransport`] ends connected by unbounded tokio channels.
//! Frames sent on one end arrive, in order, on the other. Closing either end
//! makes the peer's `recv()` report [`TransportError::ConnectionClosed`].

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// One end of an in-process connection.
#[derive(Debug)]
pub struct LoopbackTransport {
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    connected: AtomicBool,
}

impl LoopbackTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }

    fn new(tx: mpsc::UnboundedSender<Vec<u8>>, rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            connected: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx
                .send(data.to_vec())
                .map_err(|_| TransportError::ConnectionClosed),
            None => Err(TransportError::NotConnected),
        }
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_in_order() {
        let (a, b) = LoopbackTransport::pair();
        a.send(b"one").await.unwrap();
        a.send(b"two").await.unwrap();
        b.send(b"back").await.unwrap();

        assert_eq!(b.recv().await.unwrap(), b"one");
        assert_eq!(b.recv().await.unwrap(), b"two");
        assert_eq!(a.recv().await.unwrap(), b"back");
    }

    #[tokio::test]
    async fn close_ends_peer_recv() {
        let (a, b) = LoopbackTransport::pair();
        a.send(b"last").await.unwrap();
        a.close().await.unwrap();

        assert!(!a.is_connected());
        assert_eq!(b.recv().await.unwrap(), b"last");
        assert!(matches!(
            b.recv().await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn closed_end_rejects_io() {
        let (a, _b) = LoopbackTransport::pair();
        a.close().await.unwrap();

        assert!(matches!(
            a.send(b"x").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(a.recv().await, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn send_to_dropped_peer_fails() {
        let (a, b) = LoopbackTransport::pair();
        drop(b);
        assert!(matches!(
            a.send(b"x").await,
            Err(TransportError::ConnectionClosed)
        ));
    }
}
