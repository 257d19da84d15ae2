//! `backoffice-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, decimal value objects and the order-attempt lifecycle shared by
//! sales and purchases.

pub mod entity;
pub mod error;
pub mod id;
pub mod order;
pub mod quantity;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, EmployeeId, Folio, LotLabel, ProductCode, SupplierId};
pub use order::OrderPhase;
pub use quantity::{Quantity, UnitAmount};
pub use value_object::ValueObject;
