//! End-to-end flows through the wired core: product creation, stock
//! mutations, the events they emit, and the statistics they produce.

use std::sync::Arc;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;

use retail_stock::config::AppConfig;
use retail_stock::entities::{ProductCategory, StockMovementType};
use retail_stock::events::Event;
use retail_stock::repositories::{DataSource, InMemoryDataSource};
use retail_stock::{ServiceError, StockCore};

fn core() -> (StockCore, tokio::sync::mpsc::Receiver<Event>, Arc<InMemoryDataSource>) {
    let source = Arc::new(InMemoryDataSource::new());
    let (core, rx) = StockCore::new(source.clone(), &AppConfig::default());
    (core, rx, source)
}

#[tokio::test]
async fn create_adjust_and_transfer_flow() {
    let (core, mut rx, _) = core();

    let product = core
        .products
        .create_product("Laptop", Some("14 inch"), dec!(999.99), ProductCategory::Electronics)
        .await
        .unwrap();
    assert_matches!(rx.recv().await, Some(Event::ProductCreated { .. }));

    core.stock
        .create_stock_item(product.id(), 20, "ny", 5)
        .await
        .unwrap();
    assert_matches!(rx.recv().await, Some(Event::StockItemCreated { .. }));

    let pid = product.id().to_string();
    let item = core
        .stock
        .adjust_stock(&pid, -6, StockMovementType::Sale)
        .await
        .unwrap();
    assert_eq!(item.quantity(), 14);
    assert_matches!(
        rx.recv().await,
        Some(Event::StockAdjusted {
            old_quantity: 20,
            new_quantity: 14,
            ..
        })
    );

    let item = core
        .stock
        .transfer_stock(&pid, "NY", "la", 4, "clerk-7")
        .await
        .unwrap();
    assert_eq!(item.quantity(), 10);
    assert_matches!(
        rx.recv().await,
        Some(Event::StockTransferred { quantity: 4, .. })
    );
}

#[tokio::test]
async fn transfer_exceeding_available_fails_and_preserves_quantity() {
    let (core, _rx, _) = core();
    let product = core
        .products
        .create_product("Monitor", None, dec!(250), ProductCategory::Electronics)
        .await
        .unwrap();
    core.stock
        .create_stock_item(product.id(), 5, "NY", 2)
        .await
        .unwrap();

    let pid = product.id().to_string();
    assert_matches!(
        core.stock.transfer_stock(&pid, "NY", "LA", 10, "clerk-7").await,
        Err(ServiceError::InsufficientStock(_))
    );
    let item = core.stock.get_stock_item(&pid).await.unwrap().unwrap();
    assert_eq!(item.quantity(), 5);
}

#[tokio::test]
async fn stats_reflect_the_reference_inventory() {
    let (core, _rx, _) = core();

    let a = core
        .products
        .create_product("Alpha", None, dec!(10), ProductCategory::Electronics)
        .await
        .unwrap();
    let b = core
        .products
        .create_product("Bravo", None, dec!(30), ProductCategory::Electronics)
        .await
        .unwrap();
    let c = core
        .products
        .create_product("Charlie", None, dec!(5), ProductCategory::Books)
        .await
        .unwrap();

    core.stock.create_stock_item(a.id(), 0, "NY", 5).await.unwrap();
    core.stock.create_stock_item(b.id(), 4, "NY", 5).await.unwrap();
    core.stock.create_stock_item(c.id(), 100, "NY", 10).await.unwrap();
    core.stock
        .set_reorder_levels(&c.id().to_string(), 10, Some(50))
        .await
        .unwrap();

    let snapshot = core.stats.refresh().await;
    assert_eq!(snapshot.total_products, 3);
    assert_eq!(snapshot.category_breakdown[&ProductCategory::Electronics], 2);
    assert_eq!(snapshot.category_breakdown[&ProductCategory::Books], 1);

    let electronics = &snapshot.price_stats_by_category[&ProductCategory::Electronics];
    assert_eq!(electronics.average, dec!(20));
    assert_eq!(electronics.min, dec!(10));
    assert_eq!(electronics.max, dec!(30));
    assert_eq!(electronics.count, 2);

    assert_eq!(snapshot.out_of_stock_items, 1);
    assert_eq!(snapshot.low_stock_items, 1);
    assert_eq!(snapshot.alerts_count, 2);
    assert_eq!(snapshot.total_stock_value, dec!(620));

    // A read inside the freshness window returns the published snapshot.
    let cached = core.stats.get_stats().await;
    assert!(Arc::ptr_eq(&snapshot, &cached));
}

#[tokio::test]
async fn writes_invalidate_the_stats_cache() {
    let (core, _rx, _) = core();
    let product = core
        .products
        .create_product("Keyboard", None, dec!(49.99), ProductCategory::Electronics)
        .await
        .unwrap();
    core.stock
        .create_stock_item(product.id(), 10, "NY", 2)
        .await
        .unwrap();

    let before = core.stats.get_stats().await;
    assert_eq!(before.out_of_stock_items, 0);

    core.stock
        .adjust_stock(&product.id().to_string(), -10, StockMovementType::Sale)
        .await
        .unwrap();

    // The adjustment invalidated the cache, so the next read recomputes
    // even though the freshness window has not elapsed.
    let after = core.stats.get_stats().await;
    assert_eq!(after.out_of_stock_items, 1);
    assert_eq!(after.alerts_count, 1);
}

#[tokio::test]
async fn duplicate_skus_never_reach_the_data_source() {
    let (core, _rx, source) = core();
    for _ in 0..4 {
        core.products
            .create_product("Cable", None, dec!(5), ProductCategory::Electronics)
            .await
            .unwrap();
    }
    let products = source.list_all_products().await.unwrap();
    let mut skus: Vec<_> = products.iter().map(|p| p.sku().to_string()).collect();
    skus.sort();
    skus.dedup();
    assert_eq!(skus.len(), 4);
}
