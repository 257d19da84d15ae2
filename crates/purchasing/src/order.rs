use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{
    DomainError, DomainResult, EmployeeId, Entity, Folio, LotLabel, ProductCode, Quantity,
    SupplierId, UnitAmount,
};

/// Caller-supplied, not-yet-persisted purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub supplier_id: i32,
    pub employee_id: i32,
    #[serde(default)]
    pub lot: Option<String>,
    pub lines: Vec<PurchaseLineDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLineDraft {
    pub product_code: String,
    pub quantity: Decimal,
    /// Cost paid per unit this time, if the caller wants it on record.
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
}

/// A purchase draft that passed validation; ready for the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPurchase {
    pub supplier_id: SupplierId,
    pub employee_id: EmployeeId,
    pub lot: Option<LotLabel>,
    pub lines: Vec<PurchaseLineSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLineSpec {
    pub code: ProductCode,
    pub quantity: Quantity,
    pub unit_cost: Option<UnitAmount>,
}

impl PurchaseDraft {
    pub fn validate(&self) -> DomainResult<ValidatedPurchase> {
        let supplier_id = SupplierId::new(self.supplier_id)
            .map_err(|e| DomainError::validation(format!("supplier_id: {e}")))?;
        let employee_id = EmployeeId::new(self.employee_id)
            .map_err(|e| DomainError::validation(format!("employee_id: {e}")))?;

        // A blank lot is the same as no lot.
        let lot = match self.lot.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(label) => Some(LotLabel::new(label)?),
        };

        if self.lines.is_empty() {
            return Err(DomainError::validation("a purchase needs at least one line"));
        }

        let mut lines = Vec::with_capacity(self.lines.len());
        for (idx, line) in self.lines.iter().enumerate() {
            let line_no = idx + 1;
            let code = ProductCode::new(line.product_code.as_str())
                .map_err(|e| DomainError::validation(format!("line {line_no}: {e}")))?;
            let quantity = Quantity::new(line.quantity)
                .map_err(|e| DomainError::validation(format!("line {line_no}: {e}")))?;
            let unit_cost = line
                .unit_cost
                .map(UnitAmount::new)
                .transpose()
                .map_err(|e| DomainError::validation(format!("line {line_no}: {e}")))?;
            lines.push(PurchaseLineSpec {
                code,
                quantity,
                unit_cost,
            });
        }

        Ok(ValidatedPurchase {
            supplier_id,
            employee_id,
            lot,
            lines,
        })
    }
}

/// Recorded purchase (`compra` header + `detalle_compra` lines). Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub folio: Folio,
    pub recorded_at: DateTime<Utc>,
    pub supplier_id: SupplierId,
    pub employee_id: EmployeeId,
    pub lot: Option<LotLabel>,
    pub lines: Vec<PurchaseLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_code: ProductCode,
    pub quantity: Quantity,
    pub unit_cost: Option<UnitAmount>,
}

impl Entity for Purchase {
    type Id = Folio;

    fn id(&self) -> &Self::Id {
        &self.folio
    }
}

/// Listing row for purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSummary {
    pub folio: Folio,
    pub recorded_at: DateTime<Utc>,
    pub supplier_id: SupplierId,
    pub supplier_name: Option<String>,
    pub employee_id: EmployeeId,
    pub employee_name: Option<String>,
    pub lot: Option<LotLabel>,
    pub line_count: u32,
    /// Sum of quantity x recorded cost (product purchase cost when none was recorded).
    pub amount: Decimal,
}
