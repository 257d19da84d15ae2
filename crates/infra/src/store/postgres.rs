//! Postgres-backed back-office store.
//!
//! ## Locking discipline
//!
//! The recorder's stock check runs on a row read with `SELECT ... FOR UPDATE`
//! inside the same transaction that later writes the new level. Under READ
//! COMMITTED a second transaction asking for the same row waits for the first
//! to end and then sees its committed value, so check-then-write is serialized
//! per product. The `existencia >= 0` check constraint backs this up.
//!
//! ## Cancellation
//!
//! Dropping a `PgLedgerTx` without committing (e.g. the HTTP client went away
//! and the handler future was dropped) makes sqlx roll the transaction back
//! when the connection returns to the pool. A lost connection is rolled back
//! by the server.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (foreign key violation) | `23503` | `ForeignKey` |
//! | Database (check constraint violation) | `23514` | `Check` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |
//! | Other | N/A | `Backend` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use backoffice_core::{
    CustomerId, EmployeeId, Folio, LotLabel, ProductCode, Quantity, SupplierId, UnitAmount,
};
use backoffice_parties::{ContactInfo, Customer, Employee, PartyRef, Supplier};
use backoffice_products::{Product, Stock};
use backoffice_purchasing::{Purchase, PurchaseLine, PurchaseLineSpec, PurchaseSummary};
use backoffice_sales::{Sale, SaleLine, SaleLineSpec, SaleSummary};

use super::query::{BackOfficeQueries, CatalogEditor, DashboardSummary, Pagination, PeriodTotals};
use super::r#trait::{HeaderRow, LedgerTransaction, StockLedger, StoreError};

/// Postgres back-office store.
///
/// Holds the injected pool; cloning shares it. Every connection in the pool
/// has `search_path` set to the configured schema (see `db::connect`).
#[derive(Debug, Clone)]
pub struct PostgresBackOffice {
    pool: Arc<PgPool>,
}

impl PostgresBackOffice {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Open order-recording transaction on one pooled connection.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl StockLedger for PostgresBackOffice {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<PgLedgerTx, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PgLedgerTx { tx })
    }
}

#[async_trait::async_trait]
impl LedgerTransaction for PgLedgerTx {
    async fn party_exists(&mut self, party: PartyRef) -> Result<bool, StoreError> {
        // One fixed statement per table; no identifier is ever built from input.
        let sql = match party {
            PartyRef::Customer(_) => "SELECT EXISTS (SELECT 1 FROM cliente WHERE id_c = $1)",
            PartyRef::Supplier(_) => "SELECT EXISTS (SELECT 1 FROM proveedor WHERE id_p = $1)",
            PartyRef::Employee(_) => "SELECT EXISTS (SELECT 1 FROM empleado WHERE id_e = $1)",
        };

        sqlx::query_scalar::<_, bool>(sql)
            .bind(party.raw_id())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("party_exists", e))
    }

    #[instrument(skip(self), fields(code = %code), err)]
    async fn lock_stock(&mut self, code: &ProductCode) -> Result<Option<Stock>, StoreError> {
        let on_hand = sqlx::query_scalar::<_, Decimal>(
            "SELECT existencia FROM producto WHERE codigo = $1 FOR UPDATE",
        )
        .bind(code.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_stock", e))?;

        on_hand
            .map(|d| {
                Stock::new(d).map_err(|e| StoreError::Backend(format!("product {code}: {e}")))
            })
            .transpose()
    }

    async fn write_stock(&mut self, code: &ProductCode, level: Stock) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE producto SET existencia = $1 WHERE codigo = $2")
            .bind(level.on_hand())
            .bind(code.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("write_stock", e))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Backend(format!(
                "product {code} not found while holding its lock"
            )));
        }
        Ok(())
    }

    async fn insert_sale_header(
        &mut self,
        customer_id: CustomerId,
        employee_id: EmployeeId,
    ) -> Result<HeaderRow, StoreError> {
        let row = sqlx::query("INSERT INTO venta (id_c, id_e) VALUES ($1, $2) RETURNING folio_v, fecha")
            .bind(customer_id.get())
            .bind(employee_id.get())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_sale_header", e))?;

        header_from_row(&row, "folio_v")
    }

    async fn insert_sale_line(&mut self, folio: Folio, line: &SaleLineSpec) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO detalle_venta (folio_v, codigo, cantidad, observaciones)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(folio.get())
        .bind(line.code.as_str())
        .bind(line.quantity.value())
        .bind(line.notes.as_deref())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sale_line", e))?;
        Ok(())
    }

    async fn insert_purchase_header(
        &mut self,
        supplier_id: SupplierId,
        employee_id: EmployeeId,
        lot: Option<&LotLabel>,
    ) -> Result<HeaderRow, StoreError> {
        let row = sqlx::query(
            "INSERT INTO compra (id_p, id_e, lote) VALUES ($1, $2, $3) RETURNING folio_c, fecha",
        )
        .bind(supplier_id.get())
        .bind(employee_id.get())
        .bind(lot.map(LotLabel::as_str))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_header", e))?;

        header_from_row(&row, "folio_c")
    }

    async fn insert_purchase_line(
        &mut self,
        folio: Folio,
        line: &PurchaseLineSpec,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO detalle_compra (folio_c, codigo, cantidad, costo_unitario)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(folio.get())
        .bind(line.code.as_str())
        .bind(line.quantity.value())
        .bind(line.unit_cost.map(|c| c.value()))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase_line", e))?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

const PRODUCT_COLUMNS: &str =
    "codigo, descripcion, categoria, unidad_medida, existencia, precio_c, precio_v";

#[async_trait::async_trait]
impl BackOfficeQueries for PostgresBackOffice {
    #[instrument(skip(self), fields(code = %code), err)]
    async fn product(&self, code: &ProductCode) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM producto WHERE codigo = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM producto ORDER BY descripcion, codigo"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn low_stock(&self, threshold: Decimal) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM producto WHERE existencia <= $1 ORDER BY existencia, codigo"
        ))
        .bind(threshold)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("low_stock", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query(
            "SELECT id_c, nombre, telefono, rfc, domicilio, correo FROM cliente ORDER BY id_c",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("customers", e))?;

        rows.iter()
            .map(|r| {
                Ok(Customer {
                    id: serial(r, "id_c", CustomerId::new)?,
                    name: column(r, "nombre")?,
                    tax_id: column(r, "rfc")?,
                    contact: ContactInfo {
                        email: column(r, "correo")?,
                        phone: column(r, "telefono")?,
                        address: column(r, "domicilio")?,
                    },
                })
            })
            .collect()
    }

    async fn employees(&self) -> Result<Vec<Employee>, StoreError> {
        let rows = sqlx::query(
            "SELECT id_e, nombre, puesto, turno, salario, telefono FROM empleado ORDER BY id_e",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("employees", e))?;

        rows.iter()
            .map(|r| {
                Ok(Employee {
                    id: serial(r, "id_e", EmployeeId::new)?,
                    name: column(r, "nombre")?,
                    position: column(r, "puesto")?,
                    shift: column(r, "turno")?,
                    salary: column(r, "salario")?,
                    phone: column(r, "telefono")?,
                })
            })
            .collect()
    }

    async fn suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        let rows = sqlx::query(
            "SELECT id_p, nombre, contacto, telefono, direccion FROM proveedor ORDER BY id_p",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("suppliers", e))?;

        rows.iter()
            .map(|r| {
                Ok(Supplier {
                    id: serial(r, "id_p", SupplierId::new)?,
                    name: column(r, "nombre")?,
                    contact_name: column(r, "contacto")?,
                    contact: ContactInfo {
                        email: None,
                        phone: column(r, "telefono")?,
                        address: column(r, "direccion")?,
                    },
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(folio = %folio), err)]
    async fn sale(&self, folio: Folio) -> Result<Option<Sale>, StoreError> {
        let Some(header) = sqlx::query("SELECT folio_v, fecha, id_c, id_e FROM venta WHERE folio_v = $1")
            .bind(folio.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sale_header", e))?
        else {
            return Ok(None);
        };

        let lines = sqlx::query(
            "SELECT codigo, cantidad, observaciones FROM detalle_venta WHERE folio_v = $1 ORDER BY id_dv",
        )
        .bind(folio.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sale_lines", e))?;

        let lines = lines
            .iter()
            .map(|r| {
                Ok(SaleLine {
                    product_code: product_code(r, "codigo")?,
                    quantity: quantity(r, "cantidad")?,
                    notes: column(r, "observaciones")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let head = header_from_row(&header, "folio_v")?;
        Ok(Some(Sale {
            folio: head.folio,
            recorded_at: head.recorded_at,
            customer_id: serial(&header, "id_c", CustomerId::new)?,
            employee_id: serial(&header, "id_e", EmployeeId::new)?,
            lines,
        }))
    }

    async fn sales(&self, page: Pagination) -> Result<Vec<SaleSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                v.folio_v,
                v.fecha,
                v.id_c,
                c.nombre AS nombre_cliente,
                v.id_e,
                e.nombre AS nombre_empleado,
                COUNT(dv.id_dv) AS lineas,
                COALESCE(SUM(dv.cantidad * p.precio_v), 0) AS monto
            FROM venta v
            LEFT JOIN cliente c ON c.id_c = v.id_c
            LEFT JOIN empleado e ON e.id_e = v.id_e
            LEFT JOIN detalle_venta dv ON dv.folio_v = v.folio_v
            LEFT JOIN producto p ON p.codigo = dv.codigo
            GROUP BY v.folio_v, c.nombre, e.nombre
            ORDER BY v.folio_v DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sales", e))?;

        rows.iter()
            .map(|r| {
                let head = header_from_row(r, "folio_v")?;
                Ok(SaleSummary {
                    folio: head.folio,
                    recorded_at: head.recorded_at,
                    customer_id: serial(r, "id_c", CustomerId::new)?,
                    customer_name: column(r, "nombre_cliente")?,
                    employee_id: serial(r, "id_e", EmployeeId::new)?,
                    employee_name: column(r, "nombre_empleado")?,
                    line_count: line_count(r)?,
                    amount: column(r, "monto")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(folio = %folio), err)]
    async fn purchase(&self, folio: Folio) -> Result<Option<Purchase>, StoreError> {
        let Some(header) =
            sqlx::query("SELECT folio_c, fecha, id_p, id_e, lote FROM compra WHERE folio_c = $1")
                .bind(folio.get())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("purchase_header", e))?
        else {
            return Ok(None);
        };

        let lines = sqlx::query(
            "SELECT codigo, cantidad, costo_unitario FROM detalle_compra WHERE folio_c = $1 ORDER BY id_dc",
        )
        .bind(folio.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_lines", e))?;

        let lines = lines
            .iter()
            .map(|r| {
                Ok(PurchaseLine {
                    product_code: product_code(r, "codigo")?,
                    quantity: quantity(r, "cantidad")?,
                    unit_cost: optional_amount(r, "costo_unitario")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let head = header_from_row(&header, "folio_c")?;
        Ok(Some(Purchase {
            folio: head.folio,
            recorded_at: head.recorded_at,
            supplier_id: serial(&header, "id_p", SupplierId::new)?,
            employee_id: serial(&header, "id_e", EmployeeId::new)?,
            lot: lot_label(&header)?,
            lines,
        }))
    }

    async fn purchases(&self, page: Pagination) -> Result<Vec<PurchaseSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.folio_c,
                c.fecha,
                c.id_p,
                pr.nombre AS nombre_proveedor,
                c.id_e,
                e.nombre AS nombre_empleado,
                c.lote,
                COUNT(dc.id_dc) AS lineas,
                COALESCE(SUM(dc.cantidad * COALESCE(dc.costo_unitario, p.precio_c)), 0) AS monto
            FROM compra c
            LEFT JOIN proveedor pr ON pr.id_p = c.id_p
            LEFT JOIN empleado e ON e.id_e = c.id_e
            LEFT JOIN detalle_compra dc ON dc.folio_c = c.folio_c
            LEFT JOIN producto p ON p.codigo = dc.codigo
            GROUP BY c.folio_c, pr.nombre, e.nombre
            ORDER BY c.folio_c DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchases", e))?;

        rows.iter()
            .map(|r| {
                let head = header_from_row(r, "folio_c")?;
                Ok(PurchaseSummary {
                    folio: head.folio,
                    recorded_at: head.recorded_at,
                    supplier_id: serial(r, "id_p", SupplierId::new)?,
                    supplier_name: column(r, "nombre_proveedor")?,
                    employee_id: serial(r, "id_e", EmployeeId::new)?,
                    employee_name: column(r, "nombre_empleado")?,
                    lot: lot_label(r)?,
                    line_count: line_count(r)?,
                    amount: column(r, "monto")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn dashboard(
        &self,
        since: DateTime<Utc>,
        low_stock_threshold: Decimal,
    ) -> Result<DashboardSummary, StoreError> {
        let counts = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM producto) AS productos,
                (SELECT COUNT(*) FROM cliente) AS clientes,
                (SELECT COUNT(*) FROM empleado) AS empleados,
                (SELECT COUNT(*) FROM proveedor) AS proveedores,
                (SELECT COUNT(*) FROM venta) AS ventas,
                (SELECT COUNT(*) FROM compra) AS compras
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_counts", e))?;

        let recent_sales = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT v.folio_v) AS total,
                COALESCE(SUM(dv.cantidad * p.precio_v), 0) AS monto
            FROM venta v
            JOIN detalle_venta dv ON dv.folio_v = v.folio_v
            JOIN producto p ON p.codigo = dv.codigo
            WHERE v.fecha >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_recent_sales", e))?;

        let recent_purchases = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT c.folio_c) AS total,
                COALESCE(SUM(dc.cantidad * COALESCE(dc.costo_unitario, p.precio_c)), 0) AS monto
            FROM compra c
            JOIN detalle_compra dc ON dc.folio_c = c.folio_c
            JOIN producto p ON p.codigo = dc.codigo
            WHERE c.fecha >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_recent_purchases", e))?;

        Ok(DashboardSummary {
            products: column(&counts, "productos")?,
            customers: column(&counts, "clientes")?,
            employees: column(&counts, "empleados")?,
            suppliers: column(&counts, "proveedores")?,
            sales: column(&counts, "ventas")?,
            purchases: column(&counts, "compras")?,
            recent_sales: period_totals(&recent_sales)?,
            recent_purchases: period_totals(&recent_purchases)?,
            low_stock: self.low_stock(low_stock_threshold).await?,
        })
    }
}

#[async_trait::async_trait]
impl CatalogEditor for PostgresBackOffice {
    #[instrument(skip(self, product), fields(code = %product.code), err)]
    async fn create_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO producto ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(product.code.as_str())
        .bind(&product.description)
        .bind(product.category.as_deref())
        .bind(product.unit_of_measure.as_deref())
        .bind(product.on_hand.on_hand())
        .bind(product.purchase_cost.value())
        .bind(product.sale_price.value())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(code = %product.code), err)]
    async fn update_product(&self, product: &Product) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE producto
            SET descripcion = $1,
                categoria = $2,
                unidad_medida = $3,
                existencia = $4,
                precio_c = $5,
                precio_v = $6
            WHERE codigo = $7
            "#,
        )
        .bind(&product.description)
        .bind(product.category.as_deref())
        .bind(product.unit_of_measure.as_deref())
        .bind(product.on_hand.on_hand())
        .bind(product.purchase_cost.value())
        .bind(product.sale_price.value())
        .bind(product.code.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(code = %code), err)]
    async fn delete_product(&self, code: &ProductCode) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM producto WHERE codigo = $1")
            .bind(code.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        Ok(result.rows_affected() == 1)
    }
}

/// Map SQLx errors to StoreError.
pub fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("23503") => StoreError::ForeignKey(msg),
                Some("23514") | Some("22003") => StoreError::Check(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("timed out acquiring a connection in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {}: {}", operation, e)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// Row decoding

#[derive(Debug)]
struct ProductRow {
    codigo: String,
    descripcion: String,
    categoria: Option<String>,
    unidad_medida: Option<String>,
    existencia: Decimal,
    precio_c: Decimal,
    precio_v: Decimal,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            codigo: row.try_get("codigo")?,
            descripcion: row.try_get("descripcion")?,
            categoria: row.try_get("categoria")?,
            unidad_medida: row.try_get("unidad_medida")?,
            existencia: row.try_get("existencia")?,
            precio_c: row.try_get("precio_c")?,
            precio_v: row.try_get("precio_v")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| StoreError::Backend(format!("product {}: {}", row.codigo, e));
        Ok(Product {
            code: ProductCode::new(row.codigo.as_str()).map_err(|e| corrupt(e.to_string()))?,
            description: row.descripcion.clone(),
            category: row.categoria.clone(),
            unit_of_measure: row.unidad_medida.clone(),
            on_hand: Stock::new(row.existencia).map_err(|e| corrupt(e.to_string()))?,
            purchase_cost: UnitAmount::new(row.precio_c).map_err(|e| corrupt(e.to_string()))?,
            sale_price: UnitAmount::new(row.precio_v).map_err(|e| corrupt(e.to_string()))?,
        })
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let raw = ProductRow::from_row(row)
        .map_err(|e| StoreError::Backend(format!("failed to deserialize product row: {}", e)))?;
    Product::try_from(raw)
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Backend(format!("failed to read column {}: {}", name, e)))
}

fn serial<T, E>(row: &PgRow, name: &str, wrap: impl FnOnce(i32) -> Result<T, E>) -> Result<T, StoreError>
where
    E: core::fmt::Display,
{
    let raw: i32 = column(row, name)?;
    wrap(raw).map_err(|e| StoreError::Backend(format!("column {}: {}", name, e)))
}

fn header_from_row(row: &PgRow, folio_column: &str) -> Result<HeaderRow, StoreError> {
    Ok(HeaderRow {
        folio: serial(row, folio_column, Folio::new)?,
        recorded_at: column(row, "fecha")?,
    })
}

fn product_code(row: &PgRow, name: &str) -> Result<ProductCode, StoreError> {
    let raw: String = column(row, name)?;
    ProductCode::new(raw).map_err(|e| StoreError::Backend(format!("column {}: {}", name, e)))
}

fn quantity(row: &PgRow, name: &str) -> Result<Quantity, StoreError> {
    let raw: Decimal = column(row, name)?;
    Quantity::new(raw).map_err(|e| StoreError::Backend(format!("column {}: {}", name, e)))
}

fn optional_amount(row: &PgRow, name: &str) -> Result<Option<UnitAmount>, StoreError> {
    let raw: Option<Decimal> = column(row, name)?;
    raw.map(UnitAmount::new)
        .transpose()
        .map_err(|e| StoreError::Backend(format!("column {}: {}", name, e)))
}

fn lot_label(row: &PgRow) -> Result<Option<LotLabel>, StoreError> {
    let raw: Option<String> = column(row, "lote")?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => LotLabel::new(label)
            .map(Some)
            .map_err(|e| StoreError::Backend(format!("column lote: {}", e))),
    }
}

fn line_count(row: &PgRow) -> Result<u32, StoreError> {
    let raw: i64 = column(row, "lineas")?;
    u32::try_from(raw).map_err(|e| StoreError::Backend(format!("column lineas: {}", e)))
}

fn period_totals(row: &PgRow) -> Result<PeriodTotals, StoreError> {
    Ok(PeriodTotals {
        orders: column(row, "total")?,
        amount: column(row, "monto")?,
    })
}

#[cfg(test)]
mod tests {
    //! These run against a real server: `DATABASE_URL=... cargo test -- --ignored`.
    //! Each test works in its own throwaway schema.

    use super::*;
    use crate::config::{DatabaseConfig, SchemaName};
    use crate::recorder::{OrderRecorder, RecordError};
    use backoffice_sales::{SaleDraft, SaleLineDraft};

    async fn setup(schema: &str) -> PostgresBackOffice {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
        let mut config = DatabaseConfig::new(url);
        config.schema = SchemaName::new(schema).unwrap();

        let admin = sqlx::PgPool::connect(&config.url).await.unwrap();
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", config.schema.quoted()))
            .execute(&admin)
            .await
            .unwrap();
        admin.close().await;

        let pool = crate::db::connect(&config).await.unwrap();
        crate::db::ensure_schema(&pool, &config.schema).await.unwrap();

        sqlx::raw_sql(
            r#"
            INSERT INTO producto (codigo, descripcion, existencia, precio_c, precio_v)
                VALUES ('A', 'Producto A', 10, 2.00, 3.00), ('B', 'Producto B', 4, 1.00, 1.50);
            INSERT INTO cliente (nombre) VALUES ('Cliente Mostrador');
            INSERT INTO empleado (nombre) VALUES ('Juan Perez');
            INSERT INTO proveedor (nombre) VALUES ('Central de Abasto');
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        PostgresBackOffice::new(pool)
    }

    fn sale(lines: &[(&str, i64)]) -> SaleDraft {
        SaleDraft {
            customer_id: 1,
            employee_id: 1,
            lines: lines
                .iter()
                .map(|(code, qty)| SaleLineDraft {
                    product_code: code.to_string(),
                    quantity: Decimal::from(*qty),
                    notes: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn failed_sale_rolls_back_earlier_lines() {
        let store = setup("bo_test_rollback").await;
        let recorder = OrderRecorder::new(store.clone());

        let err = recorder.record_sale(&sale(&[("A", 3), ("B", 5)])).await.unwrap_err();
        assert!(matches!(err, RecordError::InsufficientStock { line: 2, .. }));

        let a = store.product(&ProductCode::new("A").unwrap()).await.unwrap().unwrap();
        assert_eq!(a.on_hand.on_hand(), Decimal::from(10));
        assert!(store.sales(Pagination::default()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs DATABASE_URL"]
    async fn row_lock_serializes_competing_sales() {
        let store = setup("bo_test_lock").await;
        let recorder = Arc::new(OrderRecorder::new(store.clone()));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let recorder = recorder.clone();
                tokio::spawn(async move { recorder.record_sale(&sale(&[("A", 6)])).await })
            })
            .collect();

        let mut ok = 0;
        let mut short = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(RecordError::InsufficientStock { .. }) => short += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((ok, short), (1, 1));

        let a = store.product(&ProductCode::new("A").unwrap()).await.unwrap().unwrap();
        assert_eq!(a.on_hand.on_hand(), Decimal::from(4));
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn referenced_product_cannot_be_deleted() {
        let store = setup("bo_test_delete").await;
        let recorder = OrderRecorder::new(store.clone());
        recorder.record_sale(&sale(&[("B", 1)])).await.unwrap();

        let err = store.delete_product(&ProductCode::new("B").unwrap()).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)));
    }
}
