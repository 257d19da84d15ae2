//! Read-side and catalog-edit interfaces.
//!
//! These are the collaborator surfaces around the order-recording core: plain
//! single-statement reads and catalog writes. They never hold stock locks and
//! never see uncommitted order data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{Folio, ProductCode};
use backoffice_parties::{Customer, Employee, Supplier};
use backoffice_products::Product;
use backoffice_purchasing::{Purchase, PurchaseSummary};
use backoffice_sales::{Sale, SaleSummary};

use super::StoreError;

/// Default on-hand level at or below which a product is listed as low stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Length of the dashboard's recent-activity window.
pub const DASHBOARD_WINDOW_DAYS: i64 = 30;

/// Pagination parameters for order history listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).clamp(1, 1000),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Order count and money amount over the dashboard window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub orders: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub products: i64,
    pub customers: i64,
    pub employees: i64,
    pub suppliers: i64,
    pub sales: i64,
    pub purchases: i64,
    pub recent_sales: PeriodTotals,
    pub recent_purchases: PeriodTotals,
    pub low_stock: Vec<Product>,
}

/// Read-only reporting queries.
#[async_trait::async_trait]
pub trait BackOfficeQueries: Send + Sync {
    async fn product(&self, code: &ProductCode) -> Result<Option<Product>, StoreError>;

    /// All products ordered by description.
    async fn products(&self) -> Result<Vec<Product>, StoreError>;

    /// Products with `on_hand <= threshold`, lowest first.
    async fn low_stock(&self, threshold: Decimal) -> Result<Vec<Product>, StoreError>;

    async fn customers(&self) -> Result<Vec<Customer>, StoreError>;

    async fn employees(&self) -> Result<Vec<Employee>, StoreError>;

    async fn suppliers(&self) -> Result<Vec<Supplier>, StoreError>;

    async fn sale(&self, folio: Folio) -> Result<Option<Sale>, StoreError>;

    /// Most recent first.
    async fn sales(&self, page: Pagination) -> Result<Vec<SaleSummary>, StoreError>;

    async fn purchase(&self, folio: Folio) -> Result<Option<Purchase>, StoreError>;

    /// Most recent first.
    async fn purchases(&self, page: Pagination) -> Result<Vec<PurchaseSummary>, StoreError>;

    /// Entity counts, activity since `since`, and the low-stock listing.
    async fn dashboard(
        &self,
        since: DateTime<Utc>,
        low_stock_threshold: Decimal,
    ) -> Result<DashboardSummary, StoreError>;
}

/// Direct catalog maintenance (outside order recording).
#[async_trait::async_trait]
pub trait CatalogEditor: Send + Sync {
    /// Fails with `StoreError::Duplicate` if the code is taken.
    async fn create_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Returns `false` if no product has that code.
    async fn update_product(&self, product: &Product) -> Result<bool, StoreError>;

    /// Returns `false` if no product has that code. Fails with
    /// `StoreError::ForeignKey` while order lines still reference it.
    async fn delete_product(&self, code: &ProductCode) -> Result<bool, StoreError>;
}
