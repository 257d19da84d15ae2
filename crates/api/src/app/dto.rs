use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{DomainResult, Folio, ProductCode, UnitAmount};
use backoffice_infra::store::Pagination;
use backoffice_products::{NewProduct, ProductUpdate};

// -------------------------
// Request DTOs
// -------------------------

/// Catalog entry as posted by clients. Values are checked when converted,
/// so malformed input becomes a `validation_error` response.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub description: String,
    pub category: Option<String>,
    pub unit_of_measure: Option<String>,
    pub on_hand: Option<Decimal>,
    pub purchase_cost: Decimal,
    pub sale_price: Decimal,
}

impl CreateProductRequest {
    pub fn into_command(self) -> DomainResult<NewProduct> {
        Ok(NewProduct {
            code: ProductCode::new(self.code)?,
            description: self.description,
            category: self.category,
            unit_of_measure: self.unit_of_measure,
            on_hand: self.on_hand.unwrap_or_default(),
            purchase_cost: UnitAmount::new(self.purchase_cost)?,
            sale_price: UnitAmount::new(self.sale_price)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub description: String,
    pub category: Option<String>,
    pub unit_of_measure: Option<String>,
    pub on_hand: Decimal,
    pub purchase_cost: Decimal,
    pub sale_price: Decimal,
}

impl UpdateProductRequest {
    pub fn into_command(self) -> DomainResult<ProductUpdate> {
        Ok(ProductUpdate {
            description: self.description,
            category: self.category,
            unit_of_measure: self.unit_of_measure,
            on_hand: self.on_hand,
            purchase_cost: UnitAmount::new(self.purchase_cost)?,
            sale_price: UnitAmount::new(self.sale_price)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.limit, self.offset)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub low_stock: Option<Decimal>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct RecordedOrder {
    pub folio: Folio,
}
