//! Storage wiring for the HTTP layer.
//!
//! Exactly one backend is active per process: Postgres when `DATABASE_URL`
//! is set, otherwise the in-memory store seeded with demo data.

use std::sync::Arc;

use anyhow::Context;

use backoffice_core::Folio;
use backoffice_infra::config::DatabaseConfig;
use backoffice_infra::db;
use backoffice_infra::recorder::{OrderRecorder, RecordError};
use backoffice_infra::store::{BackOfficeQueries, CatalogEditor, InMemoryBackOffice, PostgresBackOffice};
use backoffice_purchasing::PurchaseDraft;
use backoffice_sales::SaleDraft;

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        store: InMemoryBackOffice,
        recorder: Arc<OrderRecorder<InMemoryBackOffice>>,
    },
    Postgres {
        store: PostgresBackOffice,
        recorder: Arc<OrderRecorder<PostgresBackOffice>>,
    },
}

impl AppServices {
    pub fn in_memory(store: InMemoryBackOffice) -> Self {
        AppServices::InMemory {
            recorder: Arc::new(OrderRecorder::new(store.clone())),
            store,
        }
    }

    pub fn postgres(store: PostgresBackOffice) -> Self {
        AppServices::Postgres {
            recorder: Arc::new(OrderRecorder::new(store.clone())),
            store,
        }
    }

    /// Build services from `DATABASE_*` environment variables.
    pub async fn from_env() -> anyhow::Result<Self> {
        let Some(config) = DatabaseConfig::from_env().context("invalid database configuration")? else {
            tracing::warn!("DATABASE_URL not set; using in-memory store with demo data");
            let store = InMemoryBackOffice::with_demo_data().context("failed to seed demo data")?;
            return Ok(Self::in_memory(store));
        };

        let pool = db::connect(&config)
            .await
            .context("failed to connect to database")?;
        db::ensure_schema(&pool, &config.schema)
            .await
            .context("failed to prepare schema")?;

        Ok(Self::postgres(PostgresBackOffice::new(pool)))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory { .. } => "in_memory",
            AppServices::Postgres { .. } => "postgres",
        }
    }

    pub fn queries(&self) -> &dyn BackOfficeQueries {
        match self {
            AppServices::InMemory { store, .. } => store,
            AppServices::Postgres { store, .. } => store,
        }
    }

    pub fn catalog(&self) -> &dyn CatalogEditor {
        match self {
            AppServices::InMemory { store, .. } => store,
            AppServices::Postgres { store, .. } => store,
        }
    }

    pub async fn record_sale(&self, draft: &SaleDraft) -> Result<Folio, RecordError> {
        match self {
            AppServices::InMemory { recorder, .. } => recorder.record_sale(draft).await,
            AppServices::Postgres { recorder, .. } => recorder.record_sale(draft).await,
        }
    }

    pub async fn record_purchase(&self, draft: &PurchaseDraft) -> Result<Folio, RecordError> {
        match self {
            AppServices::InMemory { recorder, .. } => recorder.record_purchase(draft).await,
            AppServices::Postgres { recorder, .. } => recorder.record_purchase(draft).await,
        }
    }

    /// Release the storage handle. Pending transactions are rolled back by
    /// the server when their connections close.
    pub async fn close(&self) {
        if let AppServices::Postgres { store, .. } = self {
            db::close(store.pool()).await;
        }
    }
}
