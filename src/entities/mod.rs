pub mod product;
pub mod stock_item;

pub use product::{Product, ProductCategory};
pub use stock_item::{StockItem, StockMovementType, StockStatus};
