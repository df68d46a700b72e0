use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::entities::{StockItem, StockMovementType, StockStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::DataSource;
use crate::services::stats::StatsCache;

/// Alert row for an item at or below its reorder threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub product_id: String,
    pub location: String,
    pub quantity: i32,
    pub reorder_level: i32,
    pub status: StockStatus,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Status counts over the full stock listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub total_items: usize,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub over_stock_items: usize,
}

/// Orchestrates stock mutations. This is the only path by which external
/// callers change quantities, so the never-negative invariant enforced by
/// `StockItem::adjust_quantity` always holds for persisted state.
pub struct StockService {
    source: Arc<dyn DataSource>,
    event_sender: EventSender,
    stats: Arc<StatsCache>,
}

impl StockService {
    pub fn new(source: Arc<dyn DataSource>, event_sender: EventSender, stats: Arc<StatsCache>) -> Self {
        Self {
            source,
            event_sender,
            stats,
        }
    }

    /// Creates a stock record for an existing product.
    #[instrument(skip(self))]
    pub async fn create_stock_item(
        &self,
        product_id: Uuid,
        quantity: i32,
        location: &str,
        reorder_level: i32,
    ) -> Result<StockItem, ServiceError> {
        if self.source.get_product(product_id).await?.is_none() {
            return Err(ServiceError::not_found(format!(
                "product with ID {} not found",
                product_id
            )));
        }

        let item = StockItem::new(&product_id.to_string(), quantity, location, reorder_level)?;
        self.source.persist_stock_item(&item).await?;
        self.emit(Event::StockItemCreated {
            stock_item_id: item.id(),
            product_id: item.product_id().to_string(),
        })
        .await;
        self.stats.invalidate();

        info!(stock_item_id = %item.id(), product_id = %product_id, "stock item created");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn get_stock_item(&self, product_id: &str) -> Result<Option<StockItem>, ServiceError> {
        self.source.get_stock_item_by_product_id(product_id).await
    }

    /// Lists stock records held at `location`. Lookup is against the
    /// normalized (trimmed, uppercased) form records are stored under.
    #[instrument(skip(self))]
    pub async fn get_by_location(&self, location: &str) -> Result<Vec<StockItem>, ServiceError> {
        let location = location.trim().to_uppercase();
        let items = self.source.list_all_stock_items().await?;
        Ok(items
            .into_iter()
            .filter(|item| item.location() == location)
            .collect())
    }

    /// Applies a signed quantity change. `InvalidAdjustment` propagates
    /// unchanged and nothing is persisted on failure.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        delta: i32,
        movement_type: StockMovementType,
    ) -> Result<StockItem, ServiceError> {
        let mut item = self.load_item(product_id).await?;
        let old_quantity = item.quantity();

        item.adjust_quantity(delta, movement_type)?;
        self.source.persist_stock_item(&item).await?;
        self.emit(Event::StockAdjusted {
            product_id: product_id.to_string(),
            old_quantity,
            new_quantity: item.quantity(),
            movement_type,
        })
        .await;
        self.stats.invalidate();

        info!(
            product_id,
            old_quantity,
            new_quantity = item.quantity(),
            movement = %movement_type,
            "stock adjusted"
        );
        Ok(item)
    }

    /// Debits `quantity` from the stock record at `from_location`. The
    /// destination is intentionally NOT credited here; the emitted
    /// `StockTransferred` event carries `to_location` so a downstream
    /// consumer can complete the credit.
    #[instrument(skip(self))]
    pub async fn transfer_stock(
        &self,
        product_id: &str,
        from_location: &str,
        to_location: &str,
        quantity: i32,
        actor: &str,
    ) -> Result<StockItem, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::validation(
                "Transfer quantity must be greater than zero",
            ));
        }
        let from_location = from_location.trim().to_uppercase();
        let mut item = self.load_item(product_id).await?;

        if item.location() != from_location {
            return Err(ServiceError::not_found(format!(
                "stock for product {} not found at {}",
                product_id, from_location
            )));
        }
        if quantity > item.quantity() {
            return Err(ServiceError::InsufficientStock(format!(
                "available: {}, requested: {}",
                item.quantity(),
                quantity
            )));
        }

        item.adjust_quantity(-quantity, StockMovementType::Transfer)?;
        self.source.persist_stock_item(&item).await?;
        self.emit(Event::StockTransferred {
            product_id: product_id.to_string(),
            from_location: from_location.clone(),
            to_location: to_location.trim().to_uppercase(),
            quantity,
            actor: actor.to_string(),
        })
        .await;
        self.stats.invalidate();

        info!(product_id, %from_location, to_location, quantity, actor, "stock transferred");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn set_reorder_levels(
        &self,
        product_id: &str,
        reorder_level: i32,
        max_level: Option<i32>,
    ) -> Result<StockItem, ServiceError> {
        let mut item = self.load_item(product_id).await?;
        item.set_reorder_levels(reorder_level, max_level)?;
        self.source.persist_stock_item(&item).await?;
        self.stats.invalidate();

        info!(product_id, reorder_level, ?max_level, "reorder levels updated");
        Ok(item)
    }

    /// One alert per item whose status is LowStock or OutOfStock.
    #[instrument(skip(self))]
    pub async fn get_stock_alerts(&self) -> Result<Vec<StockAlert>, ServiceError> {
        let items = self.source.list_all_stock_items().await?;
        let now = Utc::now();
        Ok(items
            .iter()
            .filter(|item| item.needs_reorder())
            .map(|item| {
                let message = match item.status() {
                    StockStatus::OutOfStock => "Out of stock!".to_string(),
                    _ => format!("Low stock alert: {} remaining", item.quantity()),
                };
                StockAlert {
                    product_id: item.product_id().to_string(),
                    location: item.location().to_string(),
                    quantity: item.quantity(),
                    reorder_level: item.reorder_level(),
                    status: item.status(),
                    message,
                    raised_at: now,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn stock_summary(&self) -> Result<StockSummary, ServiceError> {
        let items = self.source.list_all_stock_items().await?;
        let mut summary = StockSummary {
            total_items: items.len(),
            low_stock_items: 0,
            out_of_stock_items: 0,
            over_stock_items: 0,
        };
        for item in &items {
            match item.status() {
                StockStatus::LowStock => summary.low_stock_items += 1,
                StockStatus::OutOfStock => summary.out_of_stock_items += 1,
                StockStatus::OverStock => summary.over_stock_items += 1,
                StockStatus::InStock => {}
            }
        }
        Ok(summary)
    }

    async fn load_item(&self, product_id: &str) -> Result<StockItem, ServiceError> {
        self.source
            .get_stock_item_by_product_id(product_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("stock not found for product {}", product_id))
            })
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            error!(error = %e, "failed to publish stock event");
        }
    }
}
