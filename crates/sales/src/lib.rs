//! Sales domain module.
//!
//! This crate contains the sale draft, its validation rules and the shape of a
//! recorded sale, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod order;

pub use order::{Sale, SaleDraft, SaleLine, SaleLineDraft, SaleLineSpec, SaleSummary, ValidatedSale};
