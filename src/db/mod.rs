use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub mod collections;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .min_connections(2)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp""#)
            .execute(&self.pool)
            .await?;

        // One table holds every collection; records are schemaless JSONB
        // keyed by (collection, id), ids assigned by the store on insert.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collection_records (
                id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                collection VARCHAR(255) NOT NULL,
                fields JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ DEFAULT NOW(),
                updated_at TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_collection_records_collection
               ON collection_records(collection)"#,
        )
        .execute(&self.pool)
        .await?;

        // Equality filters go through fields->>key, so a GIN index over the
        // mapping keeps them off sequential scans.
        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_collection_records_fields
               ON collection_records USING GIN(fields)"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
