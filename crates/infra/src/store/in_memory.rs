use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use backoffice_core::{
    CustomerId, DomainError, DomainResult, EmployeeId, Folio, LotLabel, ProductCode, SupplierId, UnitAmount,
};
use backoffice_parties::{ContactInfo, Customer, Employee, PartyRef, Supplier};
use backoffice_products::{Product, Stock};
use backoffice_purchasing::{Purchase, PurchaseLine, PurchaseLineSpec, PurchaseSummary};
use backoffice_sales::{Sale, SaleLine, SaleLineSpec, SaleSummary};

use super::query::{BackOfficeQueries, CatalogEditor, DashboardSummary, Pagination, PeriodTotals};
use super::r#trait::{HeaderRow, LedgerTransaction, StockLedger, StoreError};

#[derive(Debug, Clone, Default)]
struct State {
    products: BTreeMap<ProductCode, Product>,
    customers: BTreeMap<CustomerId, Customer>,
    employees: BTreeMap<EmployeeId, Employee>,
    suppliers: BTreeMap<SupplierId, Supplier>,
    sales: BTreeMap<Folio, Sale>,
    purchases: BTreeMap<Folio, Purchase>,
    last_customer_id: i32,
    last_employee_id: i32,
    last_supplier_id: i32,
    last_sale_folio: i32,
    last_purchase_folio: i32,
}

impl State {
    fn next_customer_id(&mut self) -> Result<CustomerId, DomainError> {
        self.last_customer_id += 1;
        CustomerId::new(self.last_customer_id)
    }

    fn next_employee_id(&mut self) -> Result<EmployeeId, DomainError> {
        self.last_employee_id += 1;
        EmployeeId::new(self.last_employee_id)
    }

    fn next_supplier_id(&mut self) -> Result<SupplierId, DomainError> {
        self.last_supplier_id += 1;
        SupplierId::new(self.last_supplier_id)
    }

    fn is_referenced(&self, code: &ProductCode) -> bool {
        self.sales
            .values()
            .any(|s| s.lines.iter().any(|l| &l.product_code == code))
            || self
                .purchases
                .values()
                .any(|p| p.lines.iter().any(|l| &l.product_code == code))
    }

    fn sale_amount(&self, sale: &Sale) -> Decimal {
        sale.lines
            .iter()
            .map(|l| {
                let price = self
                    .products
                    .get(&l.product_code)
                    .map(|p| p.sale_price.value())
                    .unwrap_or_default();
                l.quantity.value() * price
            })
            .sum()
    }

    fn purchase_amount(&self, purchase: &Purchase) -> Decimal {
        purchase
            .lines
            .iter()
            .map(|l| {
                let cost = l.unit_cost.map(|c| c.value()).or_else(|| {
                    self.products
                        .get(&l.product_code)
                        .map(|p| p.purchase_cost.value())
                });
                l.quantity.value() * cost.unwrap_or_default()
            })
            .sum()
    }
}

/// In-memory back-office store.
///
/// Intended for tests/dev. A transaction takes the single state lock for its
/// whole lifetime and works on a private copy, so writers are fully
/// serialized and nothing is visible to readers before `commit`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackOffice {
    state: Arc<Mutex<State>>,
    commit_fault: Arc<AtomicBool>,
}

impl InMemoryBackOffice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with a small produce catalog, one customer, one
    /// employee and one supplier.
    pub fn with_demo_data() -> DomainResult<Self> {
        let mut state = State::default();

        for (code, description, on_hand, cost, price) in [
            ("MAN-ROJ", "Manzana Roja", 50, 2000, 3500),
            ("PLA-TAB", "Plátano Tabasco", 100, 1200, 2200),
        ] {
            let product = Product {
                code: ProductCode::new(code)?,
                description: description.to_string(),
                category: Some("Frutas".to_string()),
                unit_of_measure: Some("kg".to_string()),
                on_hand: Stock::new(Decimal::from(on_hand))
                    .map_err(|e| DomainError::validation(e.to_string()))?,
                purchase_cost: UnitAmount::new(Decimal::new(cost, 2))?,
                sale_price: UnitAmount::new(Decimal::new(price, 2))?,
            };
            state.products.insert(product.code.clone(), product);
        }

        let employee = state.next_employee_id()?;
        state.employees.insert(
            employee,
            Employee {
                id: employee,
                name: "Juan Pérez".to_string(),
                position: Some("Vendedor".to_string()),
                shift: Some("Matutino".to_string()),
                salary: Some(Decimal::new(120000, 2)),
                phone: None,
            },
        );

        let customer = state.next_customer_id()?;
        state.customers.insert(
            customer,
            Customer {
                id: customer,
                name: Some("Cliente Mostrador".to_string()),
                tax_id: None,
                contact: ContactInfo {
                    phone: Some("000-000-0000".to_string()),
                    ..ContactInfo::default()
                },
            },
        );

        let supplier = state.next_supplier_id()?;
        state.suppliers.insert(
            supplier,
            Supplier {
                id: supplier,
                name: "Central de Abasto".to_string(),
                contact_name: None,
                contact: ContactInfo::default(),
            },
        );

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            commit_fault: Arc::default(),
        })
    }

    pub async fn add_customer(&self, name: &str) -> Result<CustomerId, StoreError> {
        let mut state = self.state.lock().await;
        let id = state.next_customer_id().map_err(backend)?;
        state.customers.insert(
            id,
            Customer {
                id,
                name: Some(name.to_string()),
                tax_id: None,
                contact: ContactInfo::default(),
            },
        );
        Ok(id)
    }

    pub async fn add_employee(&self, name: &str) -> Result<EmployeeId, StoreError> {
        let mut state = self.state.lock().await;
        let id = state.next_employee_id().map_err(backend)?;
        state.employees.insert(
            id,
            Employee {
                id,
                name: name.to_string(),
                position: None,
                shift: None,
                salary: None,
                phone: None,
            },
        );
        Ok(id)
    }

    pub async fn add_supplier(&self, name: &str) -> Result<SupplierId, StoreError> {
        let mut state = self.state.lock().await;
        let id = state.next_supplier_id().map_err(backend)?;
        state.suppliers.insert(
            id,
            Supplier {
                id,
                name: name.to_string(),
                contact_name: None,
                contact: ContactInfo::default(),
            },
        );
        Ok(id)
    }

    /// Make the next `commit` fail with `StoreError::Unavailable` and discard
    /// the transaction, as a dropped connection would.
    pub fn fail_next_commit(&self) {
        self.commit_fault.store(true, Ordering::SeqCst);
    }
}

fn backend(err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Transaction over a private copy of the store state.
pub struct InMemoryLedgerTx {
    guard: OwnedMutexGuard<State>,
    working: State,
    fail_commit: bool,
}

impl InMemoryLedgerTx {
    fn header_row(folio: i32) -> Result<HeaderRow, StoreError> {
        Ok(HeaderRow {
            folio: Folio::new(folio).map_err(backend)?,
            recorded_at: Utc::now(),
        })
    }

    fn require_parties(&self, parties: &[PartyRef]) -> Result<(), StoreError> {
        for party in parties {
            if !self.working.has_party(*party) {
                return Err(StoreError::ForeignKey(format!("{party} does not exist")));
            }
        }
        Ok(())
    }

    fn require_product(&self, code: &ProductCode) -> Result<(), StoreError> {
        if !self.working.products.contains_key(code) {
            return Err(StoreError::ForeignKey(format!("product {code} does not exist")));
        }
        Ok(())
    }
}

impl State {
    fn has_party(&self, party: PartyRef) -> bool {
        match party {
            PartyRef::Customer(id) => self.customers.contains_key(&id),
            PartyRef::Supplier(id) => self.suppliers.contains_key(&id),
            PartyRef::Employee(id) => self.employees.contains_key(&id),
        }
    }
}

#[async_trait::async_trait]
impl StockLedger for InMemoryBackOffice {
    type Tx = InMemoryLedgerTx;

    async fn begin(&self) -> Result<InMemoryLedgerTx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        let fail_commit = self.commit_fault.swap(false, Ordering::SeqCst);
        Ok(InMemoryLedgerTx {
            guard,
            working,
            fail_commit,
        })
    }
}

#[async_trait::async_trait]
impl LedgerTransaction for InMemoryLedgerTx {
    async fn party_exists(&mut self, party: PartyRef) -> Result<bool, StoreError> {
        Ok(self.working.has_party(party))
    }

    async fn lock_stock(&mut self, code: &ProductCode) -> Result<Option<Stock>, StoreError> {
        Ok(self.working.products.get(code).map(|p| p.on_hand))
    }

    async fn write_stock(&mut self, code: &ProductCode, level: Stock) -> Result<(), StoreError> {
        match self.working.products.get_mut(code) {
            Some(product) => {
                product.on_hand = level;
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "product {code} not found while holding its lock"
            ))),
        }
    }

    async fn insert_sale_header(
        &mut self,
        customer_id: CustomerId,
        employee_id: EmployeeId,
    ) -> Result<HeaderRow, StoreError> {
        self.require_parties(&[PartyRef::Customer(customer_id), PartyRef::Employee(employee_id)])?;

        let head = Self::header_row(self.working.last_sale_folio + 1)?;
        self.working.last_sale_folio += 1;
        self.working.sales.insert(
            head.folio,
            Sale {
                folio: head.folio,
                recorded_at: head.recorded_at,
                customer_id,
                employee_id,
                lines: Vec::new(),
            },
        );
        Ok(head)
    }

    async fn insert_sale_line(&mut self, folio: Folio, line: &SaleLineSpec) -> Result<(), StoreError> {
        self.require_product(&line.code)?;
        let sale = self
            .working
            .sales
            .get_mut(&folio)
            .ok_or_else(|| StoreError::ForeignKey(format!("sale {folio} does not exist")))?;
        sale.lines.push(SaleLine {
            product_code: line.code.clone(),
            quantity: line.quantity,
            notes: line.notes.clone(),
        });
        Ok(())
    }

    async fn insert_purchase_header(
        &mut self,
        supplier_id: SupplierId,
        employee_id: EmployeeId,
        lot: Option<&LotLabel>,
    ) -> Result<HeaderRow, StoreError> {
        self.require_parties(&[PartyRef::Supplier(supplier_id), PartyRef::Employee(employee_id)])?;

        let head = Self::header_row(self.working.last_purchase_folio + 1)?;
        self.working.last_purchase_folio += 1;
        self.working.purchases.insert(
            head.folio,
            Purchase {
                folio: head.folio,
                recorded_at: head.recorded_at,
                supplier_id,
                employee_id,
                lot: lot.cloned(),
                lines: Vec::new(),
            },
        );
        Ok(head)
    }

    async fn insert_purchase_line(
        &mut self,
        folio: Folio,
        line: &PurchaseLineSpec,
    ) -> Result<(), StoreError> {
        self.require_product(&line.code)?;
        let purchase = self
            .working
            .purchases
            .get_mut(&folio)
            .ok_or_else(|| StoreError::ForeignKey(format!("purchase {folio} does not exist")))?;
        purchase.lines.push(PurchaseLine {
            product_code: line.code.clone(),
            quantity: line.quantity,
            unit_cost: line.unit_cost,
        });
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::Unavailable(
                "connection lost during commit".to_string(),
            ));
        }
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl BackOfficeQueries for InMemoryBackOffice {
    async fn product(&self, code: &ProductCode) -> Result<Option<Product>, StoreError> {
        Ok(self.state.lock().await.products.get(code).cloned())
    }

    async fn products(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| {
            a.description
                .cmp(&b.description)
                .then_with(|| a.code.cmp(&b.code))
        });
        Ok(products)
    }

    async fn low_stock(&self, threshold: Decimal) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        let mut low: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.is_low_stock(threshold))
            .cloned()
            .collect();
        low.sort_by(|a, b| a.on_hand.cmp(&b.on_hand).then_with(|| a.code.cmp(&b.code)));
        Ok(low)
    }

    async fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        Ok(self.state.lock().await.customers.values().cloned().collect())
    }

    async fn employees(&self) -> Result<Vec<Employee>, StoreError> {
        Ok(self.state.lock().await.employees.values().cloned().collect())
    }

    async fn suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        Ok(self.state.lock().await.suppliers.values().cloned().collect())
    }

    async fn sale(&self, folio: Folio) -> Result<Option<Sale>, StoreError> {
        Ok(self.state.lock().await.sales.get(&folio).cloned())
    }

    async fn sales(&self, page: Pagination) -> Result<Vec<SaleSummary>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .sales
            .values()
            .rev()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|s| SaleSummary {
                folio: s.folio,
                recorded_at: s.recorded_at,
                customer_id: s.customer_id,
                customer_name: state.customers.get(&s.customer_id).and_then(|c| c.name.clone()),
                employee_id: s.employee_id,
                employee_name: state.employees.get(&s.employee_id).map(|e| e.name.clone()),
                line_count: s.lines.len() as u32,
                amount: state.sale_amount(s),
            })
            .collect())
    }

    async fn purchase(&self, folio: Folio) -> Result<Option<Purchase>, StoreError> {
        Ok(self.state.lock().await.purchases.get(&folio).cloned())
    }

    async fn purchases(&self, page: Pagination) -> Result<Vec<PurchaseSummary>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .purchases
            .values()
            .rev()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|p| PurchaseSummary {
                folio: p.folio,
                recorded_at: p.recorded_at,
                supplier_id: p.supplier_id,
                supplier_name: state.suppliers.get(&p.supplier_id).map(|s| s.name.clone()),
                employee_id: p.employee_id,
                employee_name: state.employees.get(&p.employee_id).map(|e| e.name.clone()),
                lot: p.lot.clone(),
                line_count: p.lines.len() as u32,
                amount: state.purchase_amount(p),
            })
            .collect())
    }

    async fn dashboard(
        &self,
        since: DateTime<Utc>,
        low_stock_threshold: Decimal,
    ) -> Result<DashboardSummary, StoreError> {
        let low_stock = self.low_stock(low_stock_threshold).await?;
        let state = self.state.lock().await;

        let recent_sales = state
            .sales
            .values()
            .filter(|s| s.recorded_at >= since && !s.lines.is_empty())
            .fold(PeriodTotals::default(), |acc, s| PeriodTotals {
                orders: acc.orders + 1,
                amount: acc.amount + state.sale_amount(s),
            });
        let recent_purchases = state
            .purchases
            .values()
            .filter(|p| p.recorded_at >= since && !p.lines.is_empty())
            .fold(PeriodTotals::default(), |acc, p| PeriodTotals {
                orders: acc.orders + 1,
                amount: acc.amount + state.purchase_amount(p),
            });

        Ok(DashboardSummary {
            products: state.products.len() as i64,
            customers: state.customers.len() as i64,
            employees: state.employees.len() as i64,
            suppliers: state.suppliers.len() as i64,
            sales: state.sales.len() as i64,
            purchases: state.purchases.len() as i64,
            recent_sales,
            recent_purchases,
            low_stock,
        })
    }
}

#[async_trait::async_trait]
impl CatalogEditor for InMemoryBackOffice {
    async fn create_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.products.contains_key(&product.code) {
            return Err(StoreError::Duplicate(format!(
                "product {} already exists",
                product.code
            )));
        }
        state.products.insert(product.code.clone(), product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.products.get_mut(&product.code) {
            Some(existing) => {
                *existing = product.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_product(&self, code: &ProductCode) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if !state.products.contains_key(code) {
            return Ok(false);
        }
        if state.is_referenced(code) {
            return Err(StoreError::ForeignKey(format!(
                "product {code} is referenced by recorded orders"
            )));
        }
        state.products.remove(code);
        Ok(true)
    }
}
