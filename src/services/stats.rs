//! Read-through cache of aggregate stock statistics.
//!
//! The cached snapshot and its refresh timestamp form one unit guarded by a
//! single lock; they are never read or written separately. All data-source
//! I/O and the aggregation fold happen outside the lock, so readers are
//! never blocked on an external fetch. Concurrent misses may recompute in
//! parallel; the last writer wins under the lock and no torn snapshot is
//! ever observable.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::entities::{Product, ProductCategory, StockItem};
use crate::repositories::DataSource;

/// Per-category price figures over the products observed in one refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceStats {
    pub average: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub count: usize,
}

/// Immutable aggregate produced by one refresh. Serializes to the flat
/// mapping the surrounding API layer transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_products: usize,
    pub total_stock_value: Decimal,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub alerts_count: usize,
    pub category_breakdown: BTreeMap<ProductCategory, usize>,
    pub price_stats_by_category: BTreeMap<ProductCategory, PriceStats>,
    pub last_updated: DateTime<Utc>,
}

impl StatsSnapshot {
    /// Zeroed snapshot stamped with the moment it was produced. Returned
    /// when a refresh fails before any snapshot was ever computed.
    pub fn empty() -> Self {
        Self {
            total_products: 0,
            total_stock_value: Decimal::ZERO,
            low_stock_items: 0,
            out_of_stock_items: 0,
            alerts_count: 0,
            category_breakdown: BTreeMap::new(),
            price_stats_by_category: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct CacheSlot {
    snapshot: Option<Arc<StatsSnapshot>>,
    refreshed_at: DateTime<Utc>,
}

/// Thread-safe statistics cache with bounded staleness and a
/// degrade-to-stale failure mode: `refresh` never surfaces a data-source
/// error, it answers with the previous snapshot (or an empty one) instead.
pub struct StatsCache {
    source: Arc<dyn DataSource>,
    freshness: Duration,
    slot: RwLock<CacheSlot>,
}

impl StatsCache {
    pub fn new(source: Arc<dyn DataSource>, freshness_secs: u64) -> Self {
        Self {
            source,
            freshness: Duration::seconds(freshness_secs as i64),
            slot: RwLock::new(CacheSlot {
                snapshot: None,
                refreshed_at: DateTime::UNIX_EPOCH,
            }),
        }
    }

    /// Returns the cached snapshot when it is younger than the freshness
    /// window, recomputing otherwise. The freshness check and the hit read
    /// the slot under one lock acquisition.
    pub async fn get_stats(&self) -> Arc<StatsSnapshot> {
        {
            let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
            if let Some(snapshot) = &slot.snapshot {
                if Utc::now() - slot.refreshed_at < self.freshness {
                    debug!("returning cached statistics");
                    return Arc::clone(snapshot);
                }
            }
        }
        self.refresh().await
    }

    /// Unconditionally recomputes the aggregate and publishes it. On a
    /// data-source failure the error is logged and the previous snapshot
    /// (or an empty one) is returned; callers never see the failure.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Arc<StatsSnapshot> {
        let fetched = tokio::try_join!(
            self.source.list_all_products(),
            self.source.list_all_stock_items(),
        );

        match fetched {
            Ok((products, stock_items)) => {
                let snapshot = Arc::new(aggregate(&products, &stock_items));
                let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
                slot.snapshot = Some(Arc::clone(&snapshot));
                slot.refreshed_at = snapshot.last_updated;
                info!(
                    total_products = snapshot.total_products,
                    alerts = snapshot.alerts_count,
                    "statistics cache refreshed"
                );
                snapshot
            }
            Err(e) => {
                error!(error = %e, "failed to refresh statistics cache, serving stale data");
                let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
                match &slot.snapshot {
                    Some(snapshot) => Arc::clone(snapshot),
                    None => Arc::new(StatsSnapshot::empty()),
                }
            }
        }
    }

    /// Clears the snapshot and resets the refresh timestamp to the epoch so
    /// the next `get_stats` recomputes. Safe against concurrent refreshes.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.snapshot = None;
        slot.refreshed_at = DateTime::UNIX_EPOCH;
        info!("statistics cache invalidated");
    }
}

struct PriceAcc {
    sum: Decimal,
    count: usize,
    min: Decimal,
    max: Decimal,
}

/// Pure aggregation fold over point-in-time product and stock listings.
/// Stock items whose product is missing from the product listing contribute
/// zero to the total value rather than failing the fold.
pub fn aggregate(products: &[Product], stock_items: &[StockItem]) -> StatsSnapshot {
    let mut category_breakdown: BTreeMap<ProductCategory, usize> = BTreeMap::new();
    let mut price_acc: BTreeMap<ProductCategory, PriceAcc> = BTreeMap::new();
    let mut price_index: HashMap<String, Decimal> = HashMap::with_capacity(products.len());

    for product in products {
        *category_breakdown.entry(product.category()).or_insert(0) += 1;
        let acc = price_acc.entry(product.category()).or_insert(PriceAcc {
            sum: Decimal::ZERO,
            count: 0,
            min: Decimal::MAX,
            max: Decimal::MIN,
        });
        acc.sum += product.price();
        acc.count += 1;
        acc.min = acc.min.min(product.price());
        acc.max = acc.max.max(product.price());
        price_index.insert(product.id().to_string(), product.price());
    }

    // Categories only appear when at least one product was observed, so
    // count is always >= 1 here and the division cannot be by zero.
    let price_stats_by_category = price_acc
        .into_iter()
        .map(|(category, acc)| {
            (
                category,
                PriceStats {
                    average: acc.sum / Decimal::from(acc.count),
                    min: acc.min,
                    max: acc.max,
                    count: acc.count,
                },
            )
        })
        .collect();

    let mut low_stock_items = 0;
    let mut out_of_stock_items = 0;
    let mut total_stock_value = Decimal::ZERO;
    for item in stock_items {
        match item.status() {
            crate::entities::StockStatus::OutOfStock => out_of_stock_items += 1,
            crate::entities::StockStatus::LowStock => low_stock_items += 1,
            _ => {}
        }
        if let Some(price) = price_index.get(item.product_id()) {
            total_stock_value += Decimal::from(item.quantity()) * *price;
        }
    }

    StatsSnapshot {
        total_products: products.len(),
        total_stock_value,
        low_stock_items,
        out_of_stock_items,
        alerts_count: low_stock_items + out_of_stock_items,
        category_breakdown,
        price_stats_by_category,
        last_updated: Utc::now(),
    }
}
