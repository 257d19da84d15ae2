use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{
    CustomerId, DomainError, DomainResult, EmployeeId, Entity, Folio, ProductCode, Quantity,
};

/// Caller-supplied, not-yet-persisted sale.
///
/// Holds raw values so malformed input is reported as a validation failure
/// before any storage work starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraft {
    pub customer_id: i32,
    pub employee_id: i32,
    pub lines: Vec<SaleLineDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineDraft {
    pub product_code: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A sale draft that passed validation; ready for the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSale {
    pub customer_id: CustomerId,
    pub employee_id: EmployeeId,
    pub lines: Vec<SaleLineSpec>,
}

/// Validated sale line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLineSpec {
    pub code: ProductCode,
    pub quantity: Quantity,
    pub notes: Option<String>,
}

impl SaleDraft {
    /// Check every precondition that does not need storage.
    ///
    /// Errors name the offending line (1-based) so callers can point at it.
    pub fn validate(&self) -> DomainResult<ValidatedSale> {
        let customer_id = CustomerId::new(self.customer_id)
            .map_err(|e| DomainError::validation(format!("customer_id: {e}")))?;
        let employee_id = EmployeeId::new(self.employee_id)
            .map_err(|e| DomainError::validation(format!("employee_id: {e}")))?;

        if self.lines.is_empty() {
            return Err(DomainError::validation("a sale needs at least one line"));
        }

        let mut lines = Vec::with_capacity(self.lines.len());
        for (idx, line) in self.lines.iter().enumerate() {
            let line_no = idx + 1;
            let code = ProductCode::new(line.product_code.as_str())
                .map_err(|e| DomainError::validation(format!("line {line_no}: {e}")))?;
            let quantity = Quantity::new(line.quantity)
                .map_err(|e| DomainError::validation(format!("line {line_no}: {e}")))?;
            let notes = line
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            lines.push(SaleLineSpec { code, quantity, notes });
        }

        Ok(ValidatedSale {
            customer_id,
            employee_id,
            lines,
        })
    }
}

/// Recorded sale (`venta` header + `detalle_venta` lines). Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub folio: Folio,
    pub recorded_at: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub employee_id: EmployeeId,
    pub lines: Vec<SaleLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_code: ProductCode,
    pub quantity: Quantity,
    pub notes: Option<String>,
}

impl Entity for Sale {
    type Id = Folio;

    fn id(&self) -> &Self::Id {
        &self.folio
    }
}

/// Listing row for sale history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSummary {
    pub folio: Folio,
    pub recorded_at: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub customer_name: Option<String>,
    pub employee_id: EmployeeId,
    pub employee_name: Option<String>,
    pub line_count: u32,
    /// Sum of quantity x current sale price of each line's product.
    pub amount: Decimal,
}
