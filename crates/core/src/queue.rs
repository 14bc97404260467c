//! Bounded single-producer/single-consumer queue (C1).
//!
//! Backed by `tokio::sync::mpsc`'s bounded channel for `put`/`get`
//! backpressure semantics, with the receiving half shared behind a
//! `tokio::sync::Mutex` so that a component other than the long-lived
//! consumer (the Turn Orchestrator, on interrupt) can still call `drain`.
//! `get()` holds that mutex for its whole parked wait, which can be
//! unbounded, so `drain()` (§4.1 requires it non-blocking) must never
//! `.lock().await` it — see `drain()`'s doc comment for why `try_lock`
//! is both non-blocking and still correct.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::error::{Error, Result};

pub struct BoundedQueue<T> {
    tx: mpsc::Sender<T>,
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone(), rx: Arc::clone(&self.rx) }
    }
}

impl<T: Send + 'static> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { tx, rx: Arc::new(Mutex::new(rx)) }
    }

    /// Blocks until there is room; this is the backpressure mechanism (§5).
    pub async fn put(&self, item: T) -> Result<()> {
        self.tx.send(item).await.map_err(|_| Error::QueueClosed)
    }

    /// Non-blocking; returns the item back on a full queue.
    pub fn try_put(&self, item: T) -> std::result::Result<(), T> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(item)) => Err(item),
            Err(mpsc::error::TrySendError::Closed(item)) => Err(item),
        }
    }

    /// Blocks until an item is available.
    pub async fn get(&self) -> Result<T> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(Error::QueueClosed)
    }

    /// Non-blocking; `None` on an empty queue.
    pub async fn try_get(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        rx.try_recv().ok()
    }

    /// Drops all pending items without closing the queue (§4.1). Must be
    /// non-blocking: the consumer's own `get()` holds this same mutex for
    /// its entire parked wait, and that wait is unbounded (§5's "Interrupt
    /// mid-A" scenario parks the Audio Streamer on a chunk that will never
    /// arrive). `try_lock` rather than `lock().await` is what makes this
    /// non-blocking; if the consumer currently holds the lock it is, by
    /// construction, parked with nothing buffered to receive (a blocked
    /// `recv` only blocks when the channel is empty), so losing the race
    /// to `try_lock` and draining nothing is correct, not a missed drain.
    pub fn drain(&self) {
        if let Ok(mut rx) = self.rx.try_lock() {
            while rx.try_recv().is_ok() {}
        }
    }
}
