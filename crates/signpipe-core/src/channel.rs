//! Bounded inter-stage channels with per-edge accounting.
//!
//! Every edge of a pipeline is a `sync_channel` wrapped in an [`Outbox`]
//! (producer side, cloneable) and an [`Inbox`] (consumer side). Both sides
//! count what crosses the edge so the executor can detect lost items once
//! the run is over. The channel closes when the last `Outbox` clone drops.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use indicatif::ProgressBar;

use crate::error::Disconnected;

/// Shared counters for one edge
#[derive(Debug, Default)]
pub struct EdgeCounters {
    sent: AtomicUsize,
    received: AtomicUsize,
    rejected: AtomicUsize,
}

impl EdgeCounters {
    /// Snapshot the counters under a display name
    pub fn snapshot(&self, name: impl Into<String>) -> EdgeStats {
        EdgeStats {
            name: name.into(),
            sent: self.sent.load(Ordering::Acquire),
            received: self.received.load(Ordering::Acquire),
            rejected: self.rejected.load(Ordering::Acquire),
        }
    }
}

/// Item accounting for one edge after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeStats {
    pub name: String,
    /// Items accepted by the channel
    pub sent: usize,
    /// Items taken out by the consumer
    pub received: usize,
    /// Sends refused because the consumer was gone
    pub rejected: usize,
}

impl EdgeStats {
    /// Items that entered the edge (or tried to) but were never consumed
    pub fn lost(&self) -> usize {
        self.sent.saturating_sub(self.received) + self.rejected
    }
}

/// Producer side of an edge.
#[derive(Clone)]
pub struct Outbox {
    tx: SyncSender<String>,
    counters: Arc<EdgeCounters>,
    pb: ProgressBar,
}

impl Outbox {
    /// Send one item, blocking while the channel is full (backpressure).
    pub fn send(&self, item: String) -> Result<(), Disconnected> {
        match self.tx.send(item) {
            Ok(()) => {
                self.counters.sent.fetch_add(1, Ordering::AcqRel);
                self.pb.inc(1);
                Ok(())
            }
            Err(_) => {
                self.counters.rejected.fetch_add(1, Ordering::AcqRel);
                Err(Disconnected)
            }
        }
    }
}

/// Consumer side of an edge. Iterates until every `Outbox` is dropped.
pub struct Inbox {
    rx: Receiver<String>,
    counters: Arc<EdgeCounters>,
}

impl Iterator for Inbox {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let item = self.rx.recv().ok()?;
        self.counters.received.fetch_add(1, Ordering::AcqRel);
        Some(item)
    }
}

/// Create a bounded edge holding at most `capacity` in-flight items.
///
/// `pb` ticks once per successful send; pass `ProgressBar::hidden()` when
/// nothing is displayed.
pub fn edge(capacity: usize, counters: Arc<EdgeCounters>, pb: ProgressBar) -> (Outbox, Inbox) {
    let (tx, rx) = sync_channel(capacity);
    (
        Outbox {
            tx,
            counters: counters.clone(),
            pb,
        },
        Inbox { rx, counters },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_edge(capacity: usize) -> (Outbox, Inbox, Arc<EdgeCounters>) {
        let counters = Arc::new(EdgeCounters::default());
        let (tx, rx) = edge(capacity, counters.clone(), ProgressBar::hidden());
        (tx, rx, counters)
    }

    #[test]
    fn closes_when_last_outbox_drops() {
        let (tx, rx, counters) = hidden_edge(4);
        let tx2 = tx.clone();
        tx.send("a".into()).unwrap();
        drop(tx);
        tx2.send("b".into()).unwrap();
        drop(tx2);

        let items: Vec<String> = rx.collect();
        assert_eq!(items, vec!["a", "b"]);
        let stats = counters.snapshot("e");
        assert_eq!((stats.sent, stats.received, stats.rejected), (2, 2, 0));
        assert_eq!(stats.lost(), 0);
    }

    #[test]
    fn send_after_consumer_gone_is_rejected() {
        let (tx, rx, counters) = hidden_edge(4);
        drop(rx);
        assert_eq!(tx.send("x".into()), Err(Disconnected));
        let stats = counters.snapshot("e");
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.lost(), 1);
    }

    #[test]
    fn unread_items_count_as_lost() {
        let (tx, mut rx, counters) = hidden_edge(4);
        for i in 0..3 {
            tx.send(i.to_string()).unwrap();
        }
        assert_eq!(rx.next().as_deref(), Some("0"));
        drop(rx);
        drop(tx);
        assert_eq!(counters.snapshot("e").lost(), 2);
    }

    #[test]
    fn full_channel_blocks_sender() {
        let (tx, mut rx, _) = hidden_edge(1);
        tx.send("first".into()).unwrap();

        let handle = std::thread::spawn(move || tx.send("second".into()));
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!handle.is_finished());

        assert_eq!(rx.next().as_deref(), Some("first"));
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(rx.next().as_deref(), Some("second"));
        assert_eq!(rx.next(), None);
    }
}
