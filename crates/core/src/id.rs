//! Strongly-typed identifiers used across the domain.
//!
//! Party ids and folios are storage-assigned serial numbers (always `> 0`).
//! Product codes and lot labels are caller-chosen strings bounded by the
//! column widths of the catalog tables.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a customer (`cliente`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct CustomerId(i32);

/// Identifier of a staff member (`empleado`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct EmployeeId(i32);

/// Identifier of a supplier (`proveedor`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct SupplierId(i32);

/// Sequential identifier of a sale or purchase header.
///
/// Assigned by the storage sequence at insert time; unique and monotonically
/// non-decreasing per order type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Folio(i32);

macro_rules! impl_serial_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a storage-assigned serial value. Serials start at 1.
            pub fn new(value: i32) -> Result<Self, DomainError> {
                if value <= 0 {
                    return Err(DomainError::invalid_id(format!(
                        "{}: must be positive, got {}",
                        $name, value
                    )));
                }
                Ok(Self(value))
            }

            pub fn get(&self) -> i32 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl TryFrom<i32> for $t {
            type Error = DomainError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for i32 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i32>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Self::new(raw)
            }
        }
    };
}

impl_serial_newtype!(CustomerId, "CustomerId");
impl_serial_newtype!(EmployeeId, "EmployeeId");
impl_serial_newtype!(SupplierId, "SupplierId");
impl_serial_newtype!(Folio, "Folio");

/// Product code (catalog primary key, `VARCHAR(50)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductCode(String);

impl ProductCode {
    pub const MAX_LEN: usize = 50;

    /// Validate and wrap a product code. Surrounding whitespace is trimmed.
    pub fn new(code: impl Into<String>) -> Result<Self, DomainError> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("ProductCode: must not be empty"));
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(DomainError::invalid_id(format!(
                "ProductCode: longer than {} characters",
                Self::MAX_LEN
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(DomainError::invalid_id(
                "ProductCode: control characters are not allowed",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProductCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductCode> for String {
    fn from(value: ProductCode) -> Self {
        value.0
    }
}

impl FromStr for ProductCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Lot label attached to a purchase (`VARCHAR(50)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LotLabel(String);

impl LotLabel {
    pub const MAX_LEN: usize = 50;

    pub fn new(label: impl Into<String>) -> Result<Self, DomainError> {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("lot label must not be blank"));
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(DomainError::validation(format!(
                "lot label longer than {} characters",
                Self::MAX_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for LotLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LotLabel {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LotLabel> for String {
    fn from(value: LotLabel) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_ids_reject_zero_and_negative() {
        assert!(CustomerId::new(0).is_err());
        assert!(EmployeeId::new(-3).is_err());
        assert_eq!(Folio::new(7).unwrap().get(), 7);
    }

    #[test]
    fn serial_ids_parse_from_path_segments() {
        let folio: Folio = " 42 ".parse().unwrap();
        assert_eq!(folio.get(), 42);

        let err = "abc".parse::<SupplierId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(msg) if msg.starts_with("SupplierId")));
    }

    #[test]
    fn serial_ids_validate_on_deserialize() {
        let ok: CustomerId = serde_json::from_str("3").unwrap();
        assert_eq!(ok.get(), 3);
        assert!(serde_json::from_str::<CustomerId>("0").is_err());
    }

    #[test]
    fn product_code_is_trimmed_and_bounded() {
        let code = ProductCode::new("  MAN-ROJ ").unwrap();
        assert_eq!(code.as_str(), "MAN-ROJ");

        assert!(ProductCode::new("   ").is_err());
        assert!(ProductCode::new("x".repeat(51)).is_err());
        assert!(ProductCode::new("A\u{0}B").is_err());
        assert!(ProductCode::new("é".repeat(50)).is_ok());
    }

    #[test]
    fn lot_label_rejects_blank() {
        assert!(LotLabel::new("").is_err());
        assert_eq!(LotLabel::new(" L-01 ").unwrap().as_str(), "L-01");
    }
}
