use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use backoffice_core::{CustomerId, EmployeeId, Folio, LotLabel, ProductCode, SupplierId};
use backoffice_parties::PartyRef;
use backoffice_products::Stock;
use backoffice_purchasing::PurchaseLineSpec;
use backoffice_sales::SaleLineSpec;

/// Storage operation error.
///
/// These are **infrastructure errors** (connectivity, constraints) as opposed to
/// domain errors (validation, insufficient stock).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique constraint violated (e.g. duplicate product code).
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Referential integrity violated (unknown or still-referenced row).
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// Column constraint violated (negative stock or a value past the
    /// `NUMERIC(10,2)` range).
    #[error("check constraint violation: {0}")]
    Check(String),

    /// Store unreachable, pool closed or exhausted.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Anything else, including rows that fail domain decoding.
    #[error("storage error: {0}")]
    Backend(String),
}

/// Header as written: the storage-assigned folio and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRow {
    pub folio: Folio,
    pub recorded_at: DateTime<Utc>,
}

/// Source of order-recording transactions over the shared relational store.
///
/// The product stock column is the only shared mutable resource; everything
/// the recorder reads or writes goes through a `LedgerTransaction` so that
/// the stock check and the stock write happen under the same lock.
#[async_trait::async_trait]
pub trait StockLedger: Send + Sync {
    type Tx: LedgerTransaction;

    /// Open a transaction. Dropping it without `commit` discards every write.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// One unit of work against the store.
///
/// Implementations must:
/// - make `lock_stock` block concurrent lockers of the same product until this
///   transaction ends (row-level `FOR UPDATE` or stronger)
/// - keep all writes invisible to other readers until `commit`
/// - discard all writes on `rollback` or drop
#[async_trait::async_trait]
pub trait LedgerTransaction: Send {
    async fn party_exists(&mut self, party: PartyRef) -> Result<bool, StoreError>;

    /// Read a product's on-hand quantity and hold its row lock until the
    /// transaction ends. `None` if the code is not in the catalog.
    async fn lock_stock(&mut self, code: &ProductCode) -> Result<Option<Stock>, StoreError>;

    /// Overwrite the on-hand quantity of a product locked by this transaction.
    async fn write_stock(&mut self, code: &ProductCode, level: Stock) -> Result<(), StoreError>;

    async fn insert_sale_header(
        &mut self,
        customer_id: CustomerId,
        employee_id: EmployeeId,
    ) -> Result<HeaderRow, StoreError>;

    async fn insert_sale_line(&mut self, folio: Folio, line: &SaleLineSpec) -> Result<(), StoreError>;

    async fn insert_purchase_header(
        &mut self,
        supplier_id: SupplierId,
        employee_id: EmployeeId,
        lot: Option<&LotLabel>,
    ) -> Result<HeaderRow, StoreError>;

    async fn insert_purchase_line(
        &mut self,
        folio: Folio,
        line: &PurchaseLineSpec,
    ) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl<S> StockLedger for Arc<S>
where
    S: StockLedger + ?Sized,
{
    type Tx = S::Tx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }
}
