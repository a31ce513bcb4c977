//! Consultation store access
//!
//! Provides:
//! - SeaORM entity models for consultations and patients
//! - Joined record snapshots
//! - The record extractor (`Repository`) behind the `RecordSource` trait
//! - Connection management

pub mod models;
mod records;
mod repository;

pub use records::{ConsultationRecord, JoinedRecord, PatientRecord};
pub use repository::{InMemoryRecordSource, RecordSource, Repository};

use crate::config::StoreConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Database connection wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Open the store connection from configuration
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        info!("Connecting to consultation store...");

        let mut opts = ConnectOptions::new(&config.url);
        opts
            .max_connections(config.max_connections.max(1))
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::StoreUnavailable {
                message: format!("Failed to connect to store: {}", e),
            })?;

        info!("Store connection established");

        Ok(Self { conn })
    }

    /// Get the connection for reads
    pub fn read(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the store to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::StoreUnavailable {
                message: format!("Store ping failed: {}", e),
            })?;

        Ok(())
    }
}
