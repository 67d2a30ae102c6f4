use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;
use uuid::Uuid;

use super::{IntegrationStore, StoreError};
use crate::models::{
    ApiKeyRecord, IntegrationRecord, NewApiKey, NewDataImport, NewIntegration, Source,
};

/// Postgres-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn integration_from_row(row: &PgRow) -> Result<IntegrationRecord, StoreError> {
    let source: String = row.get("source");
    Ok(IntegrationRecord {
        id: row.get("id"),
        org_id: row.get("org_id"),
        source: Source::from_str(&source).map_err(StoreError::Invalid)?,
        display_name: row.get("display_name"),
        credentials_encrypted: row.get("credentials_encrypted"),
        scopes: row.get("scopes"),
        created_at: row.get("created_at"),
        last_synced_at: row.get("last_synced_at"),
    })
}

fn api_key_from_row(row: &PgRow) -> ApiKeyRecord {
    ApiKeyRecord {
        id: row.get("id"),
        organization_id: row.get("organization_id"),
        name: row.get("name"),
        key_prefix: row.get("key_prefix"),
        key_hash: row.get("key_hash"),
        scopes: row.get("scopes"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        revoked_at: row.get("revoked_at"),
    }
}

const INTEGRATION_COLUMNS: &str =
    "id, org_id, source, display_name, credentials_encrypted, scopes, created_at, last_synced_at";

#[async_trait]
impl IntegrationStore for PgStore {
    async fn upsert_integration(
        &self,
        new: NewIntegration,
    ) -> Result<IntegrationRecord, StoreError> {
        // Single-account sources ride the partial unique index on
        // (org_id, source); ON CONFLICT makes concurrent connects converge
        // on one row instead of racing an UPDATE-then-INSERT.
        let query = if new.source.allows_multiple() {
            format!(
                r#"
                INSERT INTO integration (org_id, source, display_name, credentials_encrypted, scopes)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {INTEGRATION_COLUMNS}
                "#
            )
        } else {
            format!(
                r#"
                INSERT INTO integration (org_id, source, display_name, credentials_encrypted, scopes)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (org_id, source) WHERE source <> 'google'
                DO UPDATE SET display_name = EXCLUDED.display_name,
                              credentials_encrypted = EXCLUDED.credentials_encrypted,
                              scopes = EXCLUDED.scopes
                RETURNING {INTEGRATION_COLUMNS}
                "#
            )
        };

        let row = sqlx::query(&query)
            .bind(new.org_id)
            .bind(new.source.as_str())
            .bind(&new.display_name)
            .bind(&new.credentials_encrypted)
            .bind(&new.scopes)
            .fetch_one(&self.pool)
            .await?;

        integration_from_row(&row)
    }

    async fn find_integration(&self, id: Uuid) -> Result<Option<IntegrationRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integration WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| integration_from_row(&r)).transpose()
    }

    async fn list_integrations(&self, org_id: Uuid) -> Result<Vec<IntegrationRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integration WHERE org_id = $1 ORDER BY created_at"
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(integration_from_row).collect()
    }

    async fn update_last_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE integration SET last_synced_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_integration(&self, org_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM integration WHERE id = $1 AND org_id = $2")
            .bind(id)
            .bind(org_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_api_key(&self, new: NewApiKey) -> Result<ApiKeyRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO api_key (organization_id, name, key_prefix, key_hash, scopes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, name, key_prefix, key_hash, scopes, created_by,
                      created_at, revoked_at
            "#,
        )
        .bind(new.organization_id)
        .bind(&new.name)
        .bind(&new.key_prefix)
        .bind(&new.key_hash)
        .bind(&new.scopes)
        .bind(&new.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(api_key_from_row(&row))
    }

    async fn find_api_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, organization_id, name, key_prefix, key_hash, scopes, created_by,
                   created_at, revoked_at
            FROM api_key
            WHERE key_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| api_key_from_row(&r)))
    }

    async fn list_api_keys(&self, org_id: Uuid) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, organization_id, name, key_prefix, key_hash, scopes, created_by,
                   created_at, revoked_at
            FROM api_key
            WHERE organization_id = $1 AND revoked_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(api_key_from_row).collect())
    }

    async fn revoke_api_key(&self, org_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE api_key
            SET revoked_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .bind(org_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_data_import(&self, import: NewDataImport) -> Result<Uuid, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO data_import (org_id, file_type, data, metadata, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(import.org_id)
        .bind(&import.file_type)
        .bind(&import.data)
        .bind(&import.metadata)
        .bind(&import.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
