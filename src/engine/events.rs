//! Engine events - one per committed transition, fanned out over flume channels.

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::{AccountId, Amount, CardId, OrderId, Settlement, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RentEvent {
    OrderCreated {
        order_id: OrderId,
        card_id: CardId,
        lister: AccountId,
        price_per_day: Amount,
        term_days: u32,
    },
    OrderRented {
        order_id: OrderId,
        tenant: AccountId,
        care_deposit: Amount,
        escrowed: Amount,
        started_at: Timestamp,
    },
    OrderSettled {
        order_id: OrderId,
        settlement: Settlement,
    },
    OrderClosed {
        order_id: OrderId,
    },
    /// Settlement committed but the refund transfer was refused
    RefundDeferred {
        order_id: OrderId,
        tenant: AccountId,
        amount: Amount,
    },
    RefundClaimed {
        tenant: AccountId,
        amount: Amount,
    },
    FeesWithdrawn {
        to: AccountId,
        amount: Amount,
    },
}

/// Fan-out of events to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<flume::Sender<RentEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> flume::Receiver<RentEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver to all subscribers, dropping those whose receiver is gone.
    pub fn publish(&self, event: RentEvent) {
        let mut subs = self.subscribers.lock();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
