//! Products domain module.
//!
//! This crate contains the catalog entity and the stock rule, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage). Persisting stock
//! changes is the infra crate's job; deciding whether a change is allowed is
//! this crate's.

pub mod product;
pub mod stock;

pub use product::{NewProduct, Product, ProductUpdate};
pub use stock::{Stock, StockError};
