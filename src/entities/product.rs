use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

/// Fixed product categorization used for SKU codes and stats breakdowns.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum ProductCategory {
    Electronics,
    Clothing,
    HomeGarden,
    Books,
    Sports,
    Beauty,
    Food,
    Automotive,
}

impl ProductCategory {
    /// Two-letter SKU code: first two letters of the variant name, uppercased.
    pub fn sku_code(&self) -> String {
        self.to_string()
            .chars()
            .take(2)
            .collect::<String>()
            .to_uppercase()
    }
}

/// A sellable product. Instances only exist in a valid state: the
/// constructor and every setter re-validate before mutating, so a failed
/// update leaves the product untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    category: ProductCategory,
    sku: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with a time-derived SKU.
    pub fn new(
        name: &str,
        description: Option<&str>,
        price: Decimal,
        category: ProductCategory,
    ) -> Result<Self, ServiceError> {
        let name = validate_name(name)?;
        let sku = generate_sku(&name, category);
        Self::with_sku(&name, description, price, category, sku)
    }

    /// Creates a product with a caller-supplied SKU. Used by the product
    /// service when a freshly generated SKU collides with an existing one;
    /// regeneration happens before construction, never by mutating a built
    /// product.
    pub fn with_sku(
        name: &str,
        description: Option<&str>,
        price: Decimal,
        category: ProductCategory,
        sku: String,
    ) -> Result<Self, ServiceError> {
        let name = validate_name(name)?;
        let price = validate_price(price)?;
        let description = validate_description(description)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description,
            price,
            category,
            sku,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn category(&self) -> ProductCategory {
        self.category
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn rename(&mut self, name: &str) -> Result<(), ServiceError> {
        self.name = validate_name(name)?;
        self.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<&str>) -> Result<(), ServiceError> {
        self.description = validate_description(description)?;
        self.touch();
        Ok(())
    }

    pub fn update_price(&mut self, new_price: Decimal) -> Result<(), ServiceError> {
        self.price = validate_price(new_price)?;
        self.touch();
        Ok(())
    }

    pub fn set_category(&mut self, category: ProductCategory) {
        self.category = category;
        self.touch();
    }

    /// Adds a tag; blank or duplicate tags are silently ignored.
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return;
        }
        self.tags.push(tag.to_string());
        self.touch();
    }

    /// Removes a tag; `updated_at` is bumped only when something was removed.
    pub fn remove_tag(&mut self, tag: &str) {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        if self.tags.len() != before {
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// SKU format: `{category_code}-{name_prefix}-{suffix}` with a six-digit
/// suffix taken from the Unix timestamp at second granularity.
pub fn generate_sku(name: &str, category: ProductCategory) -> String {
    let prefix: String = name.chars().take(3).collect::<String>().to_uppercase();
    format!("{}-{}-{}", category.sku_code(), prefix, timestamp_suffix())
}

pub(crate) fn timestamp_suffix() -> String {
    let ts = Utc::now().timestamp().to_string();
    let start = ts.len().saturating_sub(6);
    ts[start..].to_string()
}

fn validate_name(name: &str) -> Result<String, ServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("Product name cannot be empty"));
    }
    if trimmed.chars().count() < NAME_MIN {
        return Err(ServiceError::validation(
            "Product name must be at least 2 characters",
        ));
    }
    if trimmed.chars().count() > NAME_MAX {
        return Err(ServiceError::validation(
            "Product name cannot exceed 100 characters",
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: Decimal) -> Result<Decimal, ServiceError> {
    if price <= Decimal::ZERO {
        return Err(ServiceError::validation(
            "Product price must be greater than zero",
        ));
    }
    if price > dec!(999999.99) {
        return Err(ServiceError::validation(
            "Product price cannot exceed 999,999.99",
        ));
    }
    Ok(price)
}

fn validate_description(description: Option<&str>) -> Result<Option<String>, ServiceError> {
    match description {
        None => Ok(None),
        Some(d) if d.chars().count() > DESCRIPTION_MAX => Err(ServiceError::validation(
            "Product description cannot exceed 500 characters",
        )),
        Some(d) => Ok(Some(d.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn product(name: &str, price: Decimal) -> Result<Product, ServiceError> {
        Product::new(name, None, price, ProductCategory::Electronics)
    }

    #[test]
    fn create_trims_and_accepts_valid_name() {
        let p = product("  Laptop  ", dec!(999.99)).unwrap();
        assert_eq!(p.name(), "Laptop");
        assert_eq!(p.price(), dec!(999.99));
    }

    #[test]
    fn create_rejects_invalid_names() {
        assert_matches!(product("", dec!(1)), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            product("   ", dec!(1)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(product("L", dec!(1)), Err(ServiceError::ValidationError(_)));
        let long = "x".repeat(101);
        assert_matches!(
            product(&long, dec!(1)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn create_rejects_out_of_range_prices() {
        assert_matches!(
            product("Laptop", Decimal::ZERO),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            product("Laptop", dec!(-5)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            product("Laptop", dec!(1000000)),
            Err(ServiceError::ValidationError(_))
        );
        assert!(product("Laptop", dec!(999999.99)).is_ok());
    }

    #[test]
    fn update_price_revalidates_without_partial_mutation() {
        let mut p = product("Laptop", dec!(100)).unwrap();
        assert_matches!(
            p.update_price(dec!(-1)),
            Err(ServiceError::ValidationError(_))
        );
        assert_eq!(p.price(), dec!(100));
        p.update_price(dec!(150)).unwrap();
        assert_eq!(p.price(), dec!(150));
    }

    #[test]
    fn sku_has_category_code_name_prefix_and_six_digit_suffix() {
        let p = product("Laptop", dec!(100)).unwrap();
        let parts: Vec<&str> = p.sku().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "EL");
        assert_eq!(parts[1], "LAP");
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn sku_prefix_shorter_for_short_names() {
        let p = Product::new("Ax", None, dec!(1), ProductCategory::Books).unwrap();
        assert!(p.sku().starts_with("BO-AX-"));
    }

    #[test]
    fn category_sku_codes() {
        assert_eq!(ProductCategory::Electronics.sku_code(), "EL");
        assert_eq!(ProductCategory::HomeGarden.sku_code(), "HO");
        assert_eq!(ProductCategory::Automotive.sku_code(), "AU");
    }

    #[test]
    fn add_tag_ignores_blanks_and_duplicates() {
        let mut p = product("Laptop", dec!(100)).unwrap();
        p.add_tag("sale");
        p.add_tag("  ");
        p.add_tag("sale");
        p.add_tag("new");
        assert_eq!(p.tags(), ["sale", "new"]);
    }

    #[test]
    fn remove_tag_only_touches_on_removal() {
        let mut p = product("Laptop", dec!(100)).unwrap();
        p.add_tag("sale");
        let stamp = p.updated_at();
        p.remove_tag("absent");
        assert_eq!(p.updated_at(), stamp);
        p.remove_tag("sale");
        assert!(p.tags().is_empty());
    }

    #[test]
    fn long_description_rejected() {
        let long = "d".repeat(501);
        assert_matches!(
            Product::new("Laptop", Some(&long), dec!(1), ProductCategory::Food),
            Err(ServiceError::ValidationError(_))
        );
    }
}
