//! Relational store boundary for the back-office.
//!
//! - `trait.rs`: transactional ledger used by the order recorder
//! - `query.rs`: read-side reporting and catalog maintenance
//! - `postgres.rs`: sqlx/Postgres backend (row locks via `SELECT ... FOR UPDATE`)
//! - `in_memory.rs`: single-process backend for tests and local development

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryBackOffice;
pub use postgres::{map_sqlx_error, PostgresBackOffice};
pub use query::{
    BackOfficeQueries, CatalogEditor, DashboardSummary, Pagination, PeriodTotals,
    DASHBOARD_WINDOW_DAYS, DEFAULT_LOW_STOCK_THRESHOLD,
};
pub use r#trait::{HeaderRow, LedgerTransaction, StockLedger, StoreError};
