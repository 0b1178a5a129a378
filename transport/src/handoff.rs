//! Rendezvous handoff between the host's stream dispatch and `accept`.
//!
//! A producer parks its item in a single-slot channel together with an
//! acknowledgement sender, then waits for the acknowledgement. A consumer takes
//! the item and acknowledges it. So an `offer` only completes once some `take`
//! owns the item, and every item reaches at most one consumer.
//!
//! Both sides race the governing [`CancellationToken`]. Items still parked when
//! the token fires are taken back out of the slot and dropped by their producer.

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

/// An item paired with the sender its producer waits on.
type Parcel<T> = (T, oneshot::Sender<()>);

pub(crate) struct Handoff<T> {
    slot: mpsc::Sender<Parcel<T>>,
    taker: Mutex<mpsc::Receiver<Parcel<T>>>,
}

impl<T> Handoff<T> {
    pub(crate) fn new() -> Self {
        let (slot, taker) = mpsc::channel(1);
        Self {
            slot,
            taker: Mutex::new(taker),
        }
    }

    /// Hand `item` to exactly one [`take`](Handoff::take) call.
    ///
    /// Returns `false` if `cancel` fired first, in which case the item was not
    /// delivered and has been dropped.
    pub(crate) async fn offer(&self, item: T, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let (ack, mut acked) = oneshot::channel();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            sent = self.slot.send((item, ack)) => {
                if sent.is_err() {
                    return false;
                }
            }
        }

        tokio::select! {
            biased;
            acked = &mut acked => return acked.is_ok(),
            _ = cancel.cancelled() => {}
        }

        // Our parcel may still sit in the slot with nobody left to take it.
        self.discard_parked().await;
        acked.try_recv().is_ok()
    }

    /// Drop every parcel still parked in the slot.
    ///
    /// Holding the taker lock means no `take` is between receiving a parcel and
    /// acknowledging it, so each producer either sees its acknowledgement or a
    /// closed channel afterwards.
    async fn discard_parked(&self) {
        let mut taker = self.taker.lock().await;
        while taker.try_recv().is_ok() {}
    }

    /// Wait for the next offered item.
    ///
    /// Returns `None` once `cancel` fires. Dropping the returned future does not
    /// lose an item, it stays parked for the next call.
    pub(crate) async fn take(&self, cancel: &CancellationToken) -> Option<T> {
        if cancel.is_cancelled() {
            return None;
        }

        let mut taker = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            taker = self.taker.lock() => taker,
        };

        let (item, ack) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            parcel = taker.recv() => parcel?,
        };

        // The producer may have given up on cancellation in the meantime, the
        // item is still ours.
        let _ = ack.send(());
        Some(item)
    }
}
