//! Database connection management

pub mod schema;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        Self::connect_with_timeout(database_url, max_connections, DEFAULT_ACQUIRE_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        tracing::info!("Initializing ledger schema...");

        for &(name, ddl) in schema::TABLES {
            sqlx::query(ddl).execute(&self.pool).await.inspect_err(|e| {
                tracing::error!(table = name, error = %e, "Failed to create table");
            })?;
        }
        for &ddl in schema::CREATE_INDEXES {
            sqlx::query(ddl).execute(&self.pool).await?;
        }

        tracing::info!("Ledger schema ready");
        Ok(())
    }
}
