use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::Database;
use crate::errors::StoreError;
use crate::models::{Fields, Record};
use crate::stores::DocumentStore;

fn fields_from_value(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

impl Database {
    /// Inserts a new record and returns the store-assigned id. Not part of
    /// the facade surface; used for seeding and by callers that own record
    /// creation.
    pub async fn insert_record(&self, collection: &str, fields: Fields) -> Result<Uuid, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO collection_records (collection, fields)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(collection)
        .bind(Value::Object(fields))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    pub async fn fetch_all_records(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, fields FROM collection_records WHERE collection = $1 ORDER BY created_at",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(|row| Record {
                id: row.get("id"),
                fields: fields_from_value(row.get("fields")),
            })
            .collect();

        Ok(records)
    }

    pub async fn fetch_record(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Fields>, StoreError> {
        let row = sqlx::query(
            "SELECT fields FROM collection_records WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| fields_from_value(row.get("fields"))))
    }

    pub async fn query_records_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, fields FROM collection_records
            WHERE collection = $1 AND fields->>$2 = $3
            ORDER BY created_at
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(|row| Record {
                id: row.get("id"),
                fields: fields_from_value(row.get("fields")),
            })
            .collect();

        Ok(records)
    }

    pub async fn update_record(
        &self,
        collection: &str,
        id: Uuid,
        patch: Fields,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE collection_records
            SET fields = fields || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }

        Ok(())
    }

    pub async fn delete_record(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        // Deleting an id that does not exist is a no-op success, matching
        // the backing store's delete semantics.
        let result = sqlx::query("DELETE FROM collection_records WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(
            "deleted {} record(s) from {} for id {}",
            result.rows_affected(),
            collection,
            id
        );

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        self.fetch_all_records(collection).await
    }

    async fn fetch_one(&self, collection: &str, id: Uuid) -> Result<Option<Fields>, StoreError> {
        self.fetch_record(collection, id).await
    }

    async fn query_equals(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Record>, StoreError> {
        self.query_records_by_field(collection, field, value).await
    }

    async fn update_partial(
        &self,
        collection: &str,
        id: Uuid,
        patch: Fields,
    ) -> Result<(), StoreError> {
        self.update_record(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        self.delete_record(collection, id).await
    }
}
