//! On-hand quantity of a product (the Stock Ledger rule).
//!
//! `Stock` can only be built non-negative, and every transition returns a new
//! value. Callers must hold the product row lock while they compute and write
//! the new level.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use backoffice_core::{Quantity, ValueObject};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// A stock level below zero was requested.
    #[error("stock level cannot be negative: {0}")]
    Negative(Decimal),

    /// A withdrawal larger than what is on hand.
    #[error("insufficient stock: requested {requested}, on hand {on_hand}")]
    Insufficient { requested: Decimal, on_hand: Decimal },
}

/// Non-negative on-hand quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Stock(Decimal);

impl Stock {
    pub fn new(on_hand: Decimal) -> Result<Self, StockError> {
        if on_hand < Decimal::ZERO {
            return Err(StockError::Negative(on_hand));
        }
        Ok(Self(on_hand))
    }

    pub fn empty() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn on_hand(&self) -> Decimal {
        self.0
    }

    pub fn covers(&self, quantity: Quantity) -> bool {
        quantity.value() <= self.0
    }

    /// Take `quantity` out of stock (sale line).
    pub fn withdraw(&self, quantity: Quantity) -> Result<Stock, StockError> {
        if !self.covers(quantity) {
            return Err(StockError::Insufficient {
                requested: quantity.value(),
                on_hand: self.0,
            });
        }
        Ok(Self(self.0 - quantity.value()))
    }

    /// Put `quantity` into stock (purchase line). No upper bound.
    pub fn deposit(&self, quantity: Quantity) -> Stock {
        Self(self.0 + quantity.value())
    }
}

impl ValueObject for Stock {}

impl Default for Stock {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Decimal> for Stock {
    type Error = StockError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Stock> for Decimal {
    fn from(value: Stock) -> Self {
        value.0
    }
}

impl core::fmt::Display for Stock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn qty(units: i64) -> Quantity {
        Quantity::new(Decimal::from(units)).unwrap()
    }

    #[test]
    fn negative_levels_are_rejected() {
        assert_eq!(
            Stock::new(Decimal::new(-1, 2)),
            Err(StockError::Negative(Decimal::new(-1, 2)))
        );
    }

    #[test]
    fn withdraw_exactly_on_hand_leaves_zero() {
        let stock = Stock::new(Decimal::from(10)).unwrap();
        assert_eq!(stock.withdraw(qty(10)).unwrap(), Stock::empty());
    }

    #[test]
    fn withdraw_more_than_on_hand_reports_both_amounts() {
        let stock = Stock::new(Decimal::from(10)).unwrap();
        let err = stock.withdraw(qty(11)).unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                requested: Decimal::from(11),
                on_hand: Decimal::from(10),
            }
        );
    }

    #[test]
    fn deposit_adds_quantity() {
        let stock = Stock::new(Decimal::from(5)).unwrap();
        assert_eq!(stock.deposit(qty(3)).on_hand(), Decimal::from(8));
    }

    #[derive(Debug, Clone)]
    enum Move {
        In(i64),
        Out(i64),
    }

    fn moves() -> impl Strategy<Value = Vec<Move>> {
        prop::collection::vec(
            prop_oneof![
                (1i64..5_000).prop_map(Move::In),
                (1i64..5_000).prop_map(Move::Out),
            ],
            0..64,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of deposits and withdrawals drives stock below zero,
        /// and rejected withdrawals leave the level untouched.
        #[test]
        fn stock_never_goes_negative(start in 0i64..10_000, moves in moves()) {
            let mut stock = Stock::new(Decimal::new(start, 2)).unwrap();
            for m in moves {
                match m {
                    Move::In(cents) => {
                        stock = stock.deposit(Quantity::new(Decimal::new(cents, 2)).unwrap());
                    }
                    Move::Out(cents) => {
                        let q = Quantity::new(Decimal::new(cents, 2)).unwrap();
                        match stock.withdraw(q) {
                            Ok(next) => stock = next,
                            Err(StockError::Insufficient { on_hand, .. }) => {
                                prop_assert_eq!(on_hand, stock.on_hand());
                            }
                            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                        }
                    }
                }
                prop_assert!(stock.on_hand() >= Decimal::ZERO);
            }
        }
    }
}
