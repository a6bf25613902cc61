//! Bounded inbound probe queue.
//!
//! The only concurrency boundary of the measurement path: the receiver task
//! pushes through a [`ProbeTx`], the engine pops through the single
//! [`ProbeRx`].  The engine also reports the queue's occupancy and capacity
//! with every interval, so the consumer half exposes both.

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::probe::Probe;

/// Create a queue holding at most `capacity` probes (minimum 1).
pub fn bounded(capacity: usize) -> (ProbeTx, ProbeRx) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ProbeTx { inner: tx }, ProbeRx { inner: rx })
}

/// Producer half.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProbeTx {
    inner: mpsc::Sender<Probe>,
}

impl ProbeTx {
    /// Enqueue without waiting.
    ///
    /// Returns `Ok(false)` when the queue is full and the probe was dropped.
    pub fn try_push(&self, probe: Probe) -> Result<bool> {
        match self.inner.try_send(probe) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::QueueClosed),
        }
    }

    /// Enqueue, waiting for room (backpressure).
    pub async fn push(&self, probe: Probe) -> Result<()> {
        self.inner.send(probe).await.map_err(|_| Error::QueueClosed)
    }
}

/// Consumer half, owned by the engine.
#[derive(Debug)]
pub struct ProbeRx {
    inner: mpsc::Receiver<Probe>,
}

impl ProbeRx {
    /// Next probe, or `None` once every producer is gone and the queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<Probe> {
        self.inner.recv().await
    }

    /// Probes currently waiting.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed capacity the queue was created with.
    pub fn capacity(&self) -> usize {
        self.inner.max_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_queue_rejects_without_blocking() {
        let (tx, mut rx) = bounded(2);
        assert!(tx.try_push(Probe::new(1, 0, 0)).unwrap());
        assert!(tx.try_push(Probe::new(1, 1, 0)).unwrap());
        assert!(!tx.try_push(Probe::new(1, 2, 0)).unwrap());
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.capacity(), 2);

        assert_eq!(rx.recv().await.unwrap().serial, 0);
        assert_eq!(rx.len(), 1);
    }

    #[tokio::test]
    async fn closed_queue_reports_error() {
        let (tx, rx) = bounded(1);
        drop(rx);
        assert!(matches!(
            tx.try_push(Probe::new(1, 0, 0)),
            Err(Error::QueueClosed)
        ));
        assert!(matches!(
            tx.push(Probe::new(1, 0, 0)).await,
            Err(Error::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn recv_ends_after_producers_drop() {
        let (tx, mut rx) = bounded(4);
        tx.push(Probe::new(1, 0, 0)).await.unwrap();
        drop(tx);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
        assert!(rx.is_empty());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (_tx, rx) = bounded(0);
        assert_eq!(rx.capacity(), 1);
    }
}
