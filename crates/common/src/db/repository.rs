//! Record extraction from the consultation store
//!
//! `Repository` reads consultations left-joined with their patients through
//! SeaORM. `InMemoryRecordSource` serves fixed records for fixtures and tests.

use super::{DbPool, JoinedRecord};
use crate::config::StoreConfig;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Source of joined consultation records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Read every consultation with its patient attached
    async fn extract(&self) -> Result<Vec<JoinedRecord>>;

    /// Check that the source is reachable
    async fn ping(&self) -> Result<()>;
}

/// Repository for the consultation store
///
/// The connection is opened on first use and held for the repository's
/// lifetime, so an engine that only reads a persisted index never touches
/// the store.
pub struct Repository {
    config: StoreConfig,
    pool: OnceCell<DbPool>,
}

impl Repository {
    /// Create a repository; no connection is made yet
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    /// Get the pool, opening the connection on first call
    async fn pool(&self) -> Result<&DbPool> {
        self.pool
            .get_or_try_init(|| DbPool::new(&self.config))
            .await
    }

    async fn conn(&self) -> Result<&DatabaseConnection> {
        Ok(self.pool().await?.read())
    }
}

#[async_trait]
impl RecordSource for Repository {
    async fn extract(&self) -> Result<Vec<JoinedRecord>> {
        let conn = self.conn().await?;

        let rows = ConsultationEntity::find()
            .find_also_related(PatientEntity)
            .order_by_asc(ConsultationColumn::Date)
            .order_by_asc(ConsultationColumn::Id)
            .all(conn)
            .await
            .map_err(|e| AppError::StoreUnavailable {
                message: format!("Failed to read consultations: {}", e),
            })?;

        let unmatched = rows.iter().filter(|(_, patient)| patient.is_none()).count();
        let records: Vec<JoinedRecord> = rows
            .into_iter()
            .map(|(consultation, patient)| JoinedRecord::from_row(consultation, patient))
            .collect();

        if unmatched > 0 {
            debug!(unmatched, "Consultations without a matching patient");
        }
        info!(records = records.len(), "Loaded consultations from store");

        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        self.pool().await?.ping().await
    }
}

/// Fixed set of records held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordSource {
    records: Vec<JoinedRecord>,
}

impl InMemoryRecordSource {
    pub fn new(records: Vec<JoinedRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn extract(&self) -> Result<Vec<JoinedRecord>> {
        info!(records = self.records.len(), "Loaded consultations from memory");
        Ok(self.records.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
