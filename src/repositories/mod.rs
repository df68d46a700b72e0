//! Abstract data-source boundary plus the in-memory implementation used by
//! tests and embedded deployments. Durable storage lives behind this trait;
//! per-item update serialization is the implementation's responsibility.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::entities::{Product, StockItem};
use crate::errors::ServiceError;

/// Narrow read/persist boundary the core consumes. Every method is async and
/// honors tokio cancellation; failures surface uniformly as
/// `ServiceError::DataSourceError`.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn list_all_products(&self) -> Result<Vec<Product>, ServiceError>;
    async fn list_all_stock_items(&self) -> Result<Vec<StockItem>, ServiceError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ServiceError>;
    async fn get_product_by_sku(&self, sku: &str) -> Result<Option<Product>, ServiceError>;
    async fn get_stock_item_by_product_id(
        &self,
        product_id: &str,
    ) -> Result<Option<StockItem>, ServiceError>;
    async fn persist_product(&self, product: &Product) -> Result<(), ServiceError>;
    async fn persist_stock_item(&self, item: &StockItem) -> Result<(), ServiceError>;
}

/// Concurrent in-memory data source. Upserts by entity id; stock items are
/// additionally reachable by product id. `fail_next` lets tests exercise the
/// degraded paths without a separate fake.
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    products: DashMap<Uuid, Product>,
    stock_items: DashMap<Uuid, StockItem>,
    fail_next: AtomicBool,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `DataSourceError` until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.fail_next.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ServiceError> {
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(ServiceError::data_source("in-memory source marked failing"));
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn list_all_products(&self) -> Result<Vec<Product>, ServiceError> {
        self.check_available()?;
        Ok(self.products.iter().map(|e| e.value().clone()).collect())
    }

    async fn list_all_stock_items(&self) -> Result<Vec<StockItem>, ServiceError> {
        self.check_available()?;
        Ok(self.stock_items.iter().map(|e| e.value().clone()).collect())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ServiceError> {
        self.check_available()?;
        Ok(self.products.get(&id).map(|e| e.value().clone()))
    }

    async fn get_product_by_sku(&self, sku: &str) -> Result<Option<Product>, ServiceError> {
        self.check_available()?;
        Ok(self
            .products
            .iter()
            .find(|e| e.value().sku() == sku)
            .map(|e| e.value().clone()))
    }

    async fn get_stock_item_by_product_id(
        &self,
        product_id: &str,
    ) -> Result<Option<StockItem>, ServiceError> {
        self.check_available()?;
        Ok(self
            .stock_items
            .iter()
            .find(|e| e.value().product_id() == product_id)
            .map(|e| e.value().clone()))
    }

    async fn persist_product(&self, product: &Product) -> Result<(), ServiceError> {
        self.check_available()?;
        self.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn persist_stock_item(&self, item: &StockItem) -> Result<(), ServiceError> {
        self.check_available()?;
        self.stock_items.insert(item.id(), item.clone());
        Ok(())
    }
}
