//! The inbound event queue feeding a watcher.
//!
//! A bounded `mpsc` channel whose senders stamp every event with a sequence
//! number taken from a shared counter once room in the queue is reserved.
//! Stopping a watcher sets a marker bit on that counter and reads the number
//! of events enqueued so far: every event stamped before the marker is still
//! processed, every event stamped after it carries the bit and is discarded.

use crate::core::Event;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Set on the sequence counter, and so on every later stamp, once the
/// consuming watcher is stopped.
const STOP_MARK: u64 = 1 << 63;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("event channel is closed")]
    Closed(Event),

    #[error("event channel is full")]
    Full(Event),
}

impl SendError {
    /// Gives back the event that could not be sent.
    pub fn into_event(self) -> Event {
        match self {
            SendError::Closed(event) | SendError::Full(event) => event,
        }
    }
}

/// An event together with its enqueue stamp.
#[derive(Debug)]
pub(crate) struct Queued {
    seq: u64,
    pub(crate) event: Event,
}

impl Queued {
    /// True when the event was enqueued after the watcher was stopped.
    pub(crate) fn after_stop(&self) -> bool {
        self.seq & STOP_MARK != 0
    }
}

/// Creates a bounded event queue. A capacity of zero is treated as one.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let seq = Arc::new(AtomicU64::new(0));
    (
        EventSender {
            tx,
            seq: seq.clone(),
        },
        EventReceiver { rx, seq },
    )
}

/// Producer half. Cheap to clone.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::Sender<Queued>,
    seq: Arc<AtomicU64>,
}

impl EventSender {
    /// Enqueues an event, waiting for room if the queue is full.
    pub async fn send(&self, event: Event) -> Result<(), SendError> {
        let Ok(permit) = self.tx.reserve().await else {
            return Err(SendError::Closed(event));
        };
        // Stamp only once capacity is reserved; the push below cannot wait.
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        permit.send(Queued { seq, event });
        Ok(())
    }

    /// Enqueues an event without waiting.
    pub fn try_send(&self, event: Event) -> Result<(), SendError> {
        let permit = match self.tx.try_reserve() {
            Ok(permit) => permit,
            Err(mpsc::error::TrySendError::Full(())) => return Err(SendError::Full(event)),
            Err(mpsc::error::TrySendError::Closed(())) => return Err(SendError::Closed(event)),
        };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        permit.send(Queued { seq, event });
        Ok(())
    }

    /// Number of events successfully enqueued so far, across all clones.
    pub fn sent(&self) -> u64 {
        self.seq.load(Ordering::SeqCst) & !STOP_MARK
    }

    /// True once the receiving watcher has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, handed to `Watcher::start_watching`.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Queued>,
    seq: Arc<AtomicU64>,
}

impl EventReceiver {
    /// Waits for the next event; `None` once every sender is dropped and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await.map(|queued| queued.event)
    }

    /// Takes the next event only if one is already queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        match self.rx.try_recv() {
            Ok(queued) => Some(queued.event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Events currently waiting in the queue.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub(crate) async fn recv_queued(&mut self) -> Option<Queued> {
        self.rx.recv().await
    }

    pub(crate) fn stop_mark(&self) -> StopMark {
        StopMark(self.seq.clone())
    }
}

/// Handle a watcher keeps to close the queue's sequence at stop time.
#[derive(Debug)]
pub(crate) struct StopMark(Arc<AtomicU64>);

impl StopMark {
    /// Marks every later stamp as after-stop and returns how many events were
    /// stamped before the mark.
    pub(crate) fn mark(&self) -> u64 {
        self.0.fetch_or(STOP_MARK, Ordering::SeqCst) & !STOP_MARK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sent_counts_across_clones() {
        let (tx, mut rx) = channel(4);
        let other = tx.clone();
        tx.send(Event::new("launching")).await.unwrap();
        other.send(Event::new("launched")).await.unwrap();

        assert_eq!(tx.sent(), 2);
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.recv().await.unwrap().event_action.as_str(), "launching");
        assert_eq!(rx.try_recv().unwrap().event_action.as_str(), "launched");
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_full_queue_is_not_counted() {
        let (tx, _rx) = channel(1);
        tx.try_send(Event::new("launching")).unwrap();
        let err = tx.try_send(Event::new("launched")).unwrap_err();

        assert!(matches!(err, SendError::Full(_)));
        assert_eq!(err.into_event().event_action.as_str(), "launched");
        assert_eq!(tx.sent(), 1);
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_fails() {
        let (tx, rx) = channel(1);
        drop(rx);
        assert!(tx.is_closed());
        assert!(matches!(
            tx.send(Event::new("launching")).await,
            Err(SendError::Closed(_))
        ));
    }

    #[tokio::test]
    async fn test_events_stamped_after_mark_are_flagged() {
        let (tx, mut rx) = channel(4);
        tx.send(Event::new("launching")).await.unwrap();
        tx.send(Event::new("launched")).await.unwrap();

        assert_eq!(rx.stop_mark().mark(), 2);
        tx.send(Event::new("running")).await.unwrap();

        let flags: Vec<bool> = [
            rx.recv_queued().await.unwrap(),
            rx.recv_queued().await.unwrap(),
            rx.recv_queued().await.unwrap(),
        ]
        .iter()
        .map(Queued::after_stop)
        .collect();
        assert_eq!(flags, vec![false, false, true]);
        assert_eq!(tx.sent(), 3);
    }
}
