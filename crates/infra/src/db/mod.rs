//! Storage handle lifecycle: open the pool at process start, bootstrap the
//! schema, close the pool at shutdown.
//!
//! Every pooled connection gets `search_path` pointed at the configured schema,
//! so all data statements use plain, parameterized SQL with unqualified table
//! names.

mod schema;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::instrument;

use crate::config::{DatabaseConfig, SchemaName};
use crate::store::{map_sqlx_error, StoreError};

pub use schema::TABLES_DDL;

/// Open the connection pool described by `config`.
#[instrument(skip(config), fields(schema = config.schema.as_str(), max_connections = config.max_connections), err)]
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let set_search_path = format!("SET search_path TO {}", config.schema.quoted());

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .after_connect(move |conn, _meta| {
            let stmt = set_search_path.clone();
            Box::pin(async move {
                sqlx::query(&stmt).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    tracing::info!("database pool ready");
    Ok(pool)
}

/// Create the schema and tables if they do not exist yet. Idempotent.
#[instrument(skip(pool), fields(schema = schema.as_str()), err)]
pub async fn ensure_schema(pool: &PgPool, schema: &SchemaName) -> Result<(), StoreError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| map_sqlx_error("begin_transaction", e))?;

    let create_schema = format!("CREATE SCHEMA IF NOT EXISTS {}", schema.quoted());
    sqlx::query(&create_schema)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_schema", e))?;

    sqlx::raw_sql(TABLES_DDL)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_tables", e))?;

    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))?;

    tracing::info!("schema ready");
    Ok(())
}

/// Close the pool, waiting for checked-out connections to be returned.
pub async fn close(pool: &PgPool) {
    pool.close().await;
    tracing::info!("database pool closed");
}
