use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

const LOCATION_MAX: usize = 50;

/// Derived stock state. Never stored; recomputed from the quantity and
/// thresholds on every read.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
    OverStock,
}

/// Why a quantity changed. Recorded on movement events for audit; every
/// movement type applies the same delta rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum StockMovementType {
    Purchase,
    Sale,
    Transfer,
    Adjustment,
    Damage,
    Return,
}

/// Per-location stock record for one product. Quantity can never go
/// negative: `adjust_quantity` either succeeds in full or leaves the item
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    id: Uuid,
    product_id: String,
    location: String,
    quantity: i32,
    reorder_level: i32,
    max_level: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StockItem {
    pub fn new(
        product_id: &str,
        quantity: i32,
        location: &str,
        reorder_level: i32,
    ) -> Result<Self, ServiceError> {
        let product_id = validate_product_id(product_id)?;
        let location = validate_location(location)?;
        let quantity = validate_quantity(quantity)?;
        let reorder_level = validate_reorder_level(reorder_level)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            location,
            quantity,
            reorder_level,
            // Default ceiling: ten times the reorder threshold.
            max_level: reorder_level * 10,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn reorder_level(&self) -> i32 {
        self.reorder_level
    }

    pub fn max_level(&self) -> i32 {
        self.max_level
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Status precedence: out-of-stock beats low (even when the reorder
    /// level is zero), low beats over, otherwise in stock. A configuration
    /// with `reorder_level >= max_level` makes `InStock` unreachable; that
    /// hazard is accepted, not guarded.
    pub fn status(&self) -> StockStatus {
        match self.quantity {
            0 => StockStatus::OutOfStock,
            q if q <= self.reorder_level => StockStatus::LowStock,
            q if q >= self.max_level => StockStatus::OverStock,
            _ => StockStatus::InStock,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    pub fn is_over_stock(&self) -> bool {
        self.quantity >= self.max_level
    }

    pub fn needs_reorder(&self) -> bool {
        matches!(self.status(), StockStatus::LowStock | StockStatus::OutOfStock)
    }

    /// Applies a signed quantity change. Fails with `InvalidAdjustment`
    /// when the result would be negative; on failure nothing is mutated.
    pub fn adjust_quantity(
        &mut self,
        delta: i32,
        _movement_type: StockMovementType,
    ) -> Result<(), ServiceError> {
        let new_quantity = match self.quantity.checked_add(delta) {
            Some(q) if q >= 0 => q,
            _ => {
                return Err(ServiceError::InvalidAdjustment(format!(
                    "adjustment would result in an invalid quantity (current: {}, change: {})",
                    self.quantity, delta
                )));
            }
        };
        self.quantity = new_quantity;
        self.touch();
        Ok(())
    }

    /// Updates the thresholds; an omitted max level is recomputed as ten
    /// times the reorder level.
    pub fn set_reorder_levels(
        &mut self,
        reorder_level: i32,
        max_level: Option<i32>,
    ) -> Result<(), ServiceError> {
        let reorder_level = validate_reorder_level(reorder_level)?;
        self.reorder_level = reorder_level;
        self.max_level = match max_level {
            Some(max) => max,
            None => reorder_level.saturating_mul(10),
        };
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_product_id(product_id: &str) -> Result<String, ServiceError> {
    let trimmed = product_id.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("Product ID cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_location(location: &str) -> Result<String, ServiceError> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("Location cannot be empty"));
    }
    if trimmed.chars().count() > LOCATION_MAX {
        return Err(ServiceError::validation(
            "Location name cannot exceed 50 characters",
        ));
    }
    Ok(trimmed.to_uppercase())
}

fn validate_quantity(quantity: i32) -> Result<i32, ServiceError> {
    if quantity < 0 {
        return Err(ServiceError::validation("Stock quantity cannot be negative"));
    }
    Ok(quantity)
}

fn validate_reorder_level(reorder_level: i32) -> Result<i32, ServiceError> {
    if reorder_level < 0 {
        return Err(ServiceError::validation("Reorder level cannot be negative"));
    }
    Ok(reorder_level)
}
