use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{CustomerId, EmployeeId, Entity, SupplierId};

/// Party kind referenced by an order header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
    Employee,
}

impl PartyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
            PartyKind::Employee => "employee",
        }
    }
}

/// Typed reference to a party, as carried by an order header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum PartyRef {
    Customer(CustomerId),
    Supplier(SupplierId),
    Employee(EmployeeId),
}

impl PartyRef {
    pub fn kind(&self) -> PartyKind {
        match self {
            PartyRef::Customer(_) => PartyKind::Customer,
            PartyRef::Supplier(_) => PartyKind::Supplier,
            PartyRef::Employee(_) => PartyKind::Employee,
        }
    }

    pub fn raw_id(&self) -> i32 {
        match self {
            PartyRef::Customer(id) => id.get(),
            PartyRef::Supplier(id) => id.get(),
            PartyRef::Employee(id) => id.get(),
        }
    }
}

impl core::fmt::Display for PartyRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.kind().as_str(), self.raw_id())
    }
}

/// Contact information for a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Customer record (`cliente`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: Option<String>,
    /// Tax registry number (RFC).
    pub tax_id: Option<String>,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

/// Staff record (`empleado`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub position: Option<String>,
    pub shift: Option<String>,
    pub salary: Option<Decimal>,
    pub phone: Option<String>,
}

/// Supplier record (`proveedor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    /// Contact person at the supplier.
    pub contact_name: Option<String>,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_ref_displays_kind_and_id() {
        let r = PartyRef::Supplier(SupplierId::new(4).unwrap());
        assert_eq!(r.to_string(), "supplier 4");
        assert_eq!(r.kind(), PartyKind::Supplier);
    }

    #[test]
    fn party_ref_serializes_tagged() {
        let r = PartyRef::Employee(EmployeeId::new(1).unwrap());
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "employee", "id": 1}));
    }

    #[test]
    fn customer_contact_is_flattened() {
        let c = Customer {
            id: CustomerId::new(1).unwrap(),
            name: Some("Cliente Mostrador".to_string()),
            tax_id: None,
            contact: ContactInfo {
                phone: Some("000-000-0000".to_string()),
                ..ContactInfo::default()
            },
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["phone"], "000-000-0000");
        assert_eq!(json["id"], 1);
    }
}
