pub mod products;
pub mod stats;
pub mod stock;

pub use products::{ProductService, UpdateProduct};
pub use stats::{PriceStats, StatsCache, StatsSnapshot};
pub use stock::{StockAlert, StockService, StockSummary};
