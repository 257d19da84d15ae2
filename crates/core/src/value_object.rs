//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two quantities
/// of `5.00` are the same quantity no matter which line they came from. To
/// "modify" one, build a new one (e.g. `Stock::withdraw` returns a new level).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
