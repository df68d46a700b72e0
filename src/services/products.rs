use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::entities::product::{generate_sku, Product, ProductCategory};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::DataSource;
use crate::services::stats::StatsCache;

/// Bounded retries for SKU regeneration on collision.
const MAX_SKU_ATTEMPTS: u32 = 5;

/// Optional field updates applied to an existing product.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<ProductCategory>,
    /// When present, replaces the tag set wholesale.
    pub tags: Option<Vec<String>>,
}

/// Service for managing products. Every successful write persists through
/// the data source, emits a domain event and invalidates the stats cache.
pub struct ProductService {
    source: Arc<dyn DataSource>,
    event_sender: EventSender,
    stats: Arc<StatsCache>,
}

impl ProductService {
    pub fn new(source: Arc<dyn DataSource>, event_sender: EventSender, stats: Arc<StatsCache>) -> Self {
        Self {
            source,
            event_sender,
            stats,
        }
    }

    /// Creates a product. The SKU is checked for uniqueness before the
    /// entity is built; on collision a fresh suffix is generated and
    /// re-checked, all prior to construction and persist.
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        name: &str,
        description: Option<&str>,
        price: Decimal,
        category: ProductCategory,
    ) -> Result<Product, ServiceError> {
        let sku = self.unique_sku(name, category).await?;
        let product = Product::with_sku(name, description, price, category, sku)?;

        self.source.persist_product(&product).await?;
        self.emit(Event::ProductCreated {
            product_id: product.id(),
            sku: product.sku().to_string(),
        })
        .await;
        self.stats.invalidate();

        info!(product_id = %product.id(), sku = %product.sku(), "product created");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ServiceError> {
        self.source.get_product(id).await
    }

    /// Applies the provided field updates through the entity's validating
    /// setters; a validation failure leaves the stored product unchanged
    /// because nothing is persisted until every setter has succeeded.
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: Uuid,
        update: UpdateProduct,
    ) -> Result<Product, ServiceError> {
        let mut product = self
            .source
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product with ID {} not found", id)))?;

        if let Some(name) = &update.name {
            product.rename(name)?;
        }
        if let Some(description) = &update.description {
            product.set_description(Some(description))?;
        }
        if let Some(price) = update.price {
            product.update_price(price)?;
        }
        if let Some(category) = update.category {
            product.set_category(category);
        }
        if let Some(tags) = &update.tags {
            for existing in product.tags().to_vec() {
                product.remove_tag(&existing);
            }
            for tag in tags {
                product.add_tag(tag);
            }
        }

        self.source.persist_product(&product).await?;
        self.emit(Event::ProductUpdated { product_id: id }).await;
        self.stats.invalidate();

        info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Applies a batch of price changes. IDs with no matching product are
    /// skipped; any invalid price fails the whole batch before anything is
    /// persisted. Returns the number of products updated.
    #[instrument(skip(self, price_updates))]
    pub async fn bulk_update_prices(
        &self,
        price_updates: &HashMap<Uuid, Decimal>,
    ) -> Result<usize, ServiceError> {
        info!(count = price_updates.len(), "bulk updating prices");

        let mut updated = Vec::with_capacity(price_updates.len());
        for (&id, &price) in price_updates {
            if let Some(mut product) = self.source.get_product(id).await? {
                product.update_price(price)?;
                updated.push(product);
            }
        }
        for product in &updated {
            self.source.persist_product(product).await?;
            self.emit(Event::ProductUpdated {
                product_id: product.id(),
            })
            .await;
        }
        if !updated.is_empty() {
            self.stats.invalidate();
        }

        info!(updated = updated.len(), "bulk price update completed");
        Ok(updated.len())
    }

    async fn unique_sku(
        &self,
        name: &str,
        category: ProductCategory,
    ) -> Result<String, ServiceError> {
        let mut sku = generate_sku(name.trim(), category);
        for attempt in 0..MAX_SKU_ATTEMPTS {
            if self.source.get_product_by_sku(&sku).await?.is_none() {
                return Ok(sku);
            }
            warn!(sku = %sku, attempt, "SKU collision, regenerating");
            let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
            let prefix: String = name.trim().chars().take(3).collect::<String>().to_uppercase();
            sku = format!("{}-{}-{:06}", category.sku_code(), prefix, suffix);
        }
        error!(name, "could not derive a unique SKU");
        Err(ServiceError::data_source(format!(
            "could not derive a unique SKU for '{}' after {} attempts",
            name, MAX_SKU_ATTEMPTS
        )))
    }

    /// Event delivery failures are logged and swallowed; the persist has
    /// already succeeded and must not be rolled back by a full channel.
    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            error!(error = %e, "failed to publish product event");
        }
    }
}
