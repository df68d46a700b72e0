//! Retail Stock Core
//!
//! Per-location inventory tracking with derived stock status and a
//! concurrent, bounded-staleness cache of aggregate statistics. Transport,
//! durable storage and authentication live outside this crate: storage is
//! consumed through the [`repositories::DataSource`] trait and every
//! successful write invalidates the statistics cache so the next read
//! recomputes.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod entities;
pub mod errors;
pub mod events;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use errors::ServiceError;

/// Wired-up core: both services sharing one data source, one event channel
/// and one statistics cache. The receiver side of the event channel is
/// handed back so the host can attach a consumer (or spawn
/// [`events::process_events`]).
pub struct StockCore {
    pub products: services::ProductService,
    pub stock: services::StockService,
    pub stats: Arc<services::StatsCache>,
}

impl StockCore {
    pub fn new(
        source: Arc<dyn repositories::DataSource>,
        config: &config::AppConfig,
    ) -> (Self, mpsc::Receiver<events::Event>) {
        let (event_sender, event_rx) = events::EventSender::channel(config.events.channel_capacity);
        let stats = Arc::new(services::StatsCache::new(
            source.clone(),
            config.stats.freshness_secs,
        ));
        let core = Self {
            products: services::ProductService::new(
                source.clone(),
                event_sender.clone(),
                stats.clone(),
            ),
            stock: services::StockService::new(source, event_sender, stats.clone()),
            stats,
        };
        (core, event_rx)
    }
}
