//! Decimal value objects.
//!
//! Quantities and unit amounts are stored as `NUMERIC(10, 2)`: at most two
//! fractional digits and an absolute value below 10^8. Values that would be
//! rounded or overflow in storage are rejected here instead.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Fractional digits kept by storage.
pub const STORAGE_SCALE: u32 = 2;

/// Exclusive upper bound for any stored decimal (`NUMERIC(10, 2)`).
pub fn storage_limit() -> Decimal {
    Decimal::new(100_000_000, 0)
}

fn check_storable(value: Decimal, what: &str) -> DomainResult<Decimal> {
    if value.normalize().scale() > STORAGE_SCALE {
        return Err(DomainError::validation(format!(
            "{what} has more than {STORAGE_SCALE} decimal places: {value}"
        )));
    }
    if value.abs() >= storage_limit() {
        return Err(DomainError::validation(format!(
            "{what} out of range: {value}"
        )));
    }
    Ok(value)
}

/// Strictly positive line quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub fn new(value: Decimal) -> DomainResult<Self> {
        let value = check_storable(value, "quantity")?;
        if value <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity must be positive, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for Quantity {}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Non-negative per-unit money amount (purchase cost or sale price).
///
/// No currency: the back-office works in a single implicit currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UnitAmount(Decimal);

impl UnitAmount {
    pub fn new(value: Decimal) -> DomainResult<Self> {
        let value = check_storable(value, "amount")?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation(format!(
                "amount must not be negative, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for UnitAmount {}

impl TryFrom<Decimal> for UnitAmount {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitAmount> for Decimal {
    fn from(value: UnitAmount) -> Self {
        value.0
    }
}

impl core::fmt::Display for UnitAmount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
