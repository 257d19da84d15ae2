//! Parties domain module (customers, staff and suppliers).
//!
//! Party records are maintained outside the order-recording core; orders only
//! need to know that a referenced party exists.

pub mod party;

pub use party::{ContactInfo, Customer, Employee, PartyKind, PartyRef, Supplier};
