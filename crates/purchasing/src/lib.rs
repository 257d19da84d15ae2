//! Purchasing domain module.
//!
//! This crate contains the purchase draft (goods received from a supplier), its
//! validation rules and the shape of a recorded purchase, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    Purchase, PurchaseDraft, PurchaseLine, PurchaseLineDraft, PurchaseLineSpec, PurchaseSummary,
    ValidatedPurchase,
};
