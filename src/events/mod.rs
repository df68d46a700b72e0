//! Domain events emitted after successful writes. Consumers (audit log,
//! webhook fan-out, the eventual destination credit for transfers) subscribe
//! on the receiving side of the channel; the core only guarantees that an
//! event is sent after its persist succeeded.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::entities::StockMovementType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductCreated {
        product_id: Uuid,
        sku: String,
    },
    ProductUpdated {
        product_id: Uuid,
    },
    StockItemCreated {
        stock_item_id: Uuid,
        product_id: String,
    },
    StockAdjusted {
        product_id: String,
        old_quantity: i32,
        new_quantity: i32,
        movement_type: StockMovementType,
    },
    StockTransferred {
        product_id: String,
        from_location: String,
        to_location: String,
        quantity: i32,
        actor: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Convenience constructor bundling a channel of the given capacity.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Spawn alongside the
/// services when no richer consumer is wired in.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        info!(?event, "domain event");
    }
}
