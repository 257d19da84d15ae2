use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, Entity, ProductCode, UnitAmount};

use crate::stock::Stock;

const DESCRIPTION_MAX: usize = 200;
const CATEGORY_MAX: usize = 100;
const UNIT_MAX: usize = 20;

/// Catalog entry (`producto`).
///
/// `on_hand` is mutated by order recording under a row lock; direct catalog
/// edits (`ProductUpdate`) may also set it, subject to the same `>= 0` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: ProductCode,
    pub description: String,
    pub category: Option<String>,
    pub unit_of_measure: Option<String>,
    pub on_hand: Stock,
    pub purchase_cost: UnitAmount,
    pub sale_price: UnitAmount,
}

impl Entity for Product {
    type Id = ProductCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}

impl Product {
    pub fn is_low_stock(&self, threshold: Decimal) -> bool {
        self.on_hand.on_hand() <= threshold
    }
}

/// Command: create a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: ProductCode,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub on_hand: Decimal,
    pub purchase_cost: UnitAmount,
    pub sale_price: UnitAmount,
}

impl NewProduct {
    pub fn into_product(self) -> DomainResult<Product> {
        let fields = ProductUpdate {
            description: self.description,
            category: self.category,
            unit_of_measure: self.unit_of_measure,
            on_hand: self.on_hand,
            purchase_cost: self.purchase_cost,
            sale_price: self.sale_price,
        };
        fields.apply_to(self.code)
    }
}

/// Command: overwrite every editable attribute of an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    pub on_hand: Decimal,
    pub purchase_cost: UnitAmount,
    pub sale_price: UnitAmount,
}

impl ProductUpdate {
    /// Validate the attributes and produce the resulting entry for `code`.
    pub fn apply_to(self, code: ProductCode) -> DomainResult<Product> {
        let description = required_text("description", self.description, DESCRIPTION_MAX)?;
        let category = optional_text("category", self.category, CATEGORY_MAX)?;
        let unit_of_measure = optional_text("unit_of_measure", self.unit_of_measure, UNIT_MAX)?;
        let on_hand = on_hand_level(self.on_hand)?;

        Ok(Product {
            code,
            description,
            category,
            unit_of_measure,
            on_hand,
            purchase_cost: self.purchase_cost,
            sale_price: self.sale_price,
        })
    }
}

fn on_hand_level(value: Decimal) -> DomainResult<Stock> {
    let stock = Stock::new(value).map_err(|e| DomainError::validation(e.to_string()))?;
    // Same storage bounds as the amount columns.
    UnitAmount::new(value)?;
    Ok(stock)
}

fn required_text(field: &str, value: String, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} longer than {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, value: Option<String>, max: usize) -> DomainResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => required_text(field, v, max).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            code: ProductCode::new("MAN-ROJ").unwrap(),
            description: " Manzana Roja ".to_string(),
            category: Some("Frutas".to_string()),
            unit_of_measure: Some("kg".to_string()),
            on_hand: Decimal::from(50),
            purchase_cost: UnitAmount::new(Decimal::new(2000, 2)).unwrap(),
            sale_price: UnitAmount::new(Decimal::new(3500, 2)).unwrap(),
        }
    }

    #[test]
    fn new_product_is_normalized() {
        let product = new_product().into_product().unwrap();
        assert_eq!(product.description, "Manzana Roja");
        assert_eq!(product.on_hand.on_hand(), Decimal::from(50));
        assert_eq!(product.id().as_str(), "MAN-ROJ");
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        let mut cmd = new_product();
        cmd.category = Some("   ".to_string());
        assert_eq!(cmd.into_product().unwrap().category, None);
    }

    #[test]
    fn catalog_edit_cannot_set_negative_stock() {
        let mut cmd = new_product();
        cmd.on_hand = Decimal::new(-5, 1);
        let err = cmd.into_product().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn description_is_required_and_bounded() {
        let mut cmd = new_product();
        cmd.description = String::new();
        assert!(cmd.into_product().is_err());

        let mut cmd = new_product();
        cmd.description = "x".repeat(201);
        assert!(cmd.into_product().is_err());
    }

    #[test]
    fn low_stock_threshold_is_inclusive() {
        let product = new_product().into_product().unwrap();
        assert!(product.is_low_stock(Decimal::from(50)));
        assert!(!product.is_low_stock(Decimal::from(49)));
    }
}
