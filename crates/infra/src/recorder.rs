//! Order recording (sales and purchases).
//!
//! `OrderRecorder` turns a validated draft into one header row, its line rows
//! and the matching stock adjustments, all inside a single storage
//! transaction. Either everything is written or nothing is.
//!
//! ## Recording Flow
//!
//! ```text
//! Draft
//!   ↓
//! 1. Validate the draft (no storage access)
//!   ↓
//! 2. Begin transaction
//!   ↓
//! 3. Check referenced parties exist
//!   ↓
//! 4. Lock every distinct product row, in code order
//!   ↓
//! 5. Insert header (storage assigns folio + timestamp)
//!   ↓
//! 6. Per line: check stock, insert line, write new stock level
//!   ↓
//! 7. Commit and return the folio
//! ```
//!
//! Any failure after step 2 rolls the transaction back before the error is
//! returned, so a failed attempt leaves storage exactly as it found it.
//!
//! ## Concurrency
//!
//! Stock is checked and written while the product row lock is held, so two
//! sales competing for the last units are serialized by the store: the second
//! one sees the first one's committed level. Locks are taken in ascending
//! product-code order, so two orders touching the same products cannot
//! deadlock each other. A product listed on several lines is locked once and
//! its lines are applied cumulatively.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, instrument, warn, Span};

use backoffice_core::quantity::storage_limit;
use backoffice_core::{DomainError, Folio, OrderPhase, ProductCode};
use backoffice_parties::PartyRef;
use backoffice_products::{Stock, StockError};
use backoffice_purchasing::{PurchaseDraft, ValidatedPurchase};
use backoffice_sales::{SaleDraft, ValidatedSale};

use crate::store::{LedgerTransaction, StockLedger, StoreError};

/// Something an order referred to that storage does not know.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Product(ProductCode),
    Party(PartyRef),
}

impl core::fmt::Display for Reference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Reference::Product(code) => write!(f, "product {code}"),
            Reference::Party(party) => write!(f, "{party}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The draft was malformed. Nothing touched storage.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A product or party referenced by the order does not exist.
    #[error("unknown reference: {0}")]
    UnknownReference(Reference),

    /// A sale line asked for more than was on hand (after earlier lines of the
    /// same sale were applied). `line` is 1-based.
    #[error("insufficient stock for {code} on line {line}: requested {requested}, on hand {on_hand}")]
    InsufficientStock {
        line: usize,
        code: ProductCode,
        requested: Decimal,
        on_hand: Decimal,
    },

    /// Storage failed (connection, constraint, commit).
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl RecordError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::Validation(_) => "validation",
            RecordError::UnknownReference(_) => "unknown_reference",
            RecordError::InsufficientStock { .. } => "insufficient_stock",
            RecordError::Persistence(_) => "persistence_failure",
        }
    }
}

impl From<DomainError> for RecordError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => RecordError::Validation(msg),
            DomainError::NotFound => RecordError::Validation("not found".to_string()),
        }
    }
}

/// Lifecycle bookkeeping for one recording attempt.
struct Attempt {
    order: &'static str,
    phase: OrderPhase,
}

impl Attempt {
    fn new(order: &'static str) -> Self {
        Self {
            order,
            phase: OrderPhase::Draft,
        }
    }

    fn enter(&mut self, next: OrderPhase) {
        match self.phase.advance(next) {
            Ok(phase) => {
                debug!(order = self.order, from = %self.phase, to = %phase, "order phase");
                self.phase = phase;
            }
            Err(e) => warn!(order = self.order, error = %e, "unexpected order phase transition"),
        }
    }
}

/// Records sales and purchases against a `StockLedger`.
///
/// Cheap to share behind an `Arc`; each call opens its own transaction.
#[derive(Debug, Clone)]
pub struct OrderRecorder<L> {
    ledger: L,
}

impl<L> OrderRecorder<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }
}

impl<L> OrderRecorder<L>
where
    L: StockLedger,
{
    /// Record a sale and withdraw its quantities from stock.
    ///
    /// Returns the new sale's folio. On `InsufficientStock` the error names
    /// the first offending line; nothing is written.
    #[instrument(
        skip(self, draft),
        fields(
            customer_id = draft.customer_id,
            employee_id = draft.employee_id,
            lines = draft.lines.len(),
            folio = tracing::field::Empty
        ),
        err
    )]
    pub async fn record_sale(&self, draft: &SaleDraft) -> Result<Folio, RecordError> {
        let mut attempt = Attempt::new("sale");
        attempt.enter(OrderPhase::Validating);
        let sale = match draft.validate() {
            Ok(sale) => sale,
            Err(e) => {
                attempt.enter(OrderPhase::Aborted);
                return Err(e.into());
            }
        };

        attempt.enter(OrderPhase::Persisting);
        let mut tx = self.begin(&mut attempt).await?;
        let written = write_sale(&mut tx, &sale).await;
        finish(tx, written, attempt).await
    }

    /// Record a purchase and deposit its quantities into stock.
    #[instrument(
        skip(self, draft),
        fields(
            supplier_id = draft.supplier_id,
            employee_id = draft.employee_id,
            lines = draft.lines.len(),
            folio = tracing::field::Empty
        ),
        err
    )]
    pub async fn record_purchase(&self, draft: &PurchaseDraft) -> Result<Folio, RecordError> {
        let mut attempt = Attempt::new("purchase");
        attempt.enter(OrderPhase::Validating);
        let purchase = match draft.validate() {
            Ok(purchase) => purchase,
            Err(e) => {
                attempt.enter(OrderPhase::Aborted);
                return Err(e.into());
            }
        };

        attempt.enter(OrderPhase::Persisting);
        let mut tx = self.begin(&mut attempt).await?;
        let written = write_purchase(&mut tx, &purchase).await;
        finish(tx, written, attempt).await
    }

    async fn begin(&self, attempt: &mut Attempt) -> Result<L::Tx, RecordError> {
        match self.ledger.begin().await {
            Ok(tx) => Ok(tx),
            Err(e) => {
                attempt.enter(OrderPhase::Aborted);
                warn!(order = attempt.order, error = %e, "could not open transaction");
                Err(e.into())
            }
        }
    }
}

async fn finish<T>(
    tx: T,
    written: Result<Folio, RecordError>,
    mut attempt: Attempt,
) -> Result<Folio, RecordError>
where
    T: LedgerTransaction,
{
    let folio = match written {
        Ok(folio) => folio,
        Err(e) => {
            attempt.enter(OrderPhase::Aborted);
            warn!(order = attempt.order, error = %e, "rolling back order");
            if let Err(rollback) = tx.rollback().await {
                warn!(order = attempt.order, error = %rollback, "rollback failed");
            }
            return Err(e);
        }
    };

    if let Err(e) = tx.commit().await {
        attempt.enter(OrderPhase::Aborted);
        warn!(order = attempt.order, error = %e, "commit failed");
        return Err(e.into());
    }

    attempt.enter(OrderPhase::Committed);
    Span::current().record("folio", folio.get());
    info!(order = attempt.order, folio = folio.get(), "order recorded");
    Ok(folio)
}

async fn require_party<T>(tx: &mut T, party: PartyRef) -> Result<(), RecordError>
where
    T: LedgerTransaction,
{
    if tx.party_exists(party).await? {
        Ok(())
    } else {
        Err(RecordError::UnknownReference(Reference::Party(party)))
    }
}

/// Lock each distinct product once, in ascending code order.
async fn lock_products<'a, T>(
    tx: &mut T,
    codes: impl Iterator<Item = &'a ProductCode>,
) -> Result<BTreeMap<ProductCode, Stock>, RecordError>
where
    T: LedgerTransaction,
{
    let mut levels: BTreeMap<ProductCode, Stock> =
        codes.map(|code| (code.clone(), Stock::empty())).collect();

    for (code, level) in levels.iter_mut() {
        *level = tx
            .lock_stock(code)
            .await?
            .ok_or_else(|| RecordError::UnknownReference(Reference::Product(code.clone())))?;
    }
    Ok(levels)
}

fn locked_level<'m>(
    levels: &'m mut BTreeMap<ProductCode, Stock>,
    code: &ProductCode,
) -> Result<&'m mut Stock, RecordError> {
    levels.get_mut(code).ok_or_else(|| {
        RecordError::Persistence(StoreError::Backend(format!("product {code} was not locked")))
    })
}

async fn write_sale<T>(tx: &mut T, sale: &ValidatedSale) -> Result<Folio, RecordError>
where
    T: LedgerTransaction,
{
    require_party(tx, PartyRef::Customer(sale.customer_id)).await?;
    require_party(tx, PartyRef::Employee(sale.employee_id)).await?;

    let mut levels = lock_products(tx, sale.lines.iter().map(|l| &l.code)).await?;
    let head = tx
        .insert_sale_header(sale.customer_id, sale.employee_id)
        .await?;

    for (idx, line) in sale.lines.iter().enumerate() {
        let level = locked_level(&mut levels, &line.code)?;
        *level = level.withdraw(line.quantity).map_err(|e| match e {
            StockError::Insufficient { requested, on_hand } => RecordError::InsufficientStock {
                line: idx + 1,
                code: line.code.clone(),
                requested,
                on_hand,
            },
            StockError::Negative(_) => RecordError::Validation(format!("line {}: {}", idx + 1, e)),
        })?;

        tx.insert_sale_line(head.folio, line).await?;
        tx.write_stock(&line.code, *level).await?;
    }

    Ok(head.folio)
}

async fn write_purchase<T>(tx: &mut T, purchase: &ValidatedPurchase) -> Result<Folio, RecordError>
where
    T: LedgerTransaction,
{
    require_party(tx, PartyRef::Supplier(purchase.supplier_id)).await?;
    require_party(tx, PartyRef::Employee(purchase.employee_id)).await?;

    let mut levels = lock_products(tx, purchase.lines.iter().map(|l| &l.code)).await?;
    let head = tx
        .insert_purchase_header(
            purchase.supplier_id,
            purchase.employee_id,
            purchase.lot.as_ref(),
        )
        .await?;

    for (idx, line) in purchase.lines.iter().enumerate() {
        let level = locked_level(&mut levels, &line.code)?;
        let raised = level.deposit(line.quantity);
        // Same failure Postgres reports when NUMERIC(10,2) overflows.
        if raised.on_hand() >= storage_limit() {
            return Err(StoreError::Check(format!(
                "line {}: stock of {} would exceed the storable limit {}",
                idx + 1,
                line.code,
                storage_limit()
            ))
            .into());
        }
        *level = raised;

        tx.insert_purchase_line(head.folio, line).await?;
        tx.write_stock(&line.code, *level).await?;
    }

    Ok(head.folio)
}
