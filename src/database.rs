// src/database.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::info;

/// Stored ATS credentials for one owner key: the short-lived bearer token
/// plus the long-lived refresh token used to renew it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credentials {
    pub owner_key: String,
    pub access_token: String,
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DatabaseConfig {
    pub database_path: PathBuf,
    pub pool: Option<SqlitePool>,
}

impl DatabaseConfig {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            pool: None,
        }
    }

    /// Initialize the database connection pool
    pub async fn init_pool(&mut self) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", self.database_path.display());

        let pool = SqlitePool::connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;
        self.pool = Some(pool);

        info!("Database connection pool initialized: {}", database_url);
        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> Result<&SqlitePool> {
        self.pool.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Database pool not initialized. Call init_pool() first.")
        })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        run_migrations(self.pool()?).await
    }
}

/// Create the credentials table.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS credentials (
            owner_key TEXT PRIMARY KEY,
            access_token TEXT NOT NULL,
            refresh_token TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}

pub struct CredentialsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CredentialsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the credentials stored for an owner key
    pub async fn find_by_owner(&self, owner_key: &str) -> Result<Option<Credentials>> {
        let credentials = sqlx::query_as::<_, Credentials>(
            r#"
            SELECT owner_key, access_token, refresh_token, created_at, updated_at
            FROM credentials
            WHERE owner_key = ?
            "#,
        )
        .bind(owner_key)
        .fetch_optional(self.pool)
        .await?;

        Ok(credentials)
    }

    /// Store or replace the credentials for an owner key
    pub async fn upsert(
        &self,
        owner_key: &str,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Credentials> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO credentials (owner_key, access_token, refresh_token, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(owner_key) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(owner_key)
        .bind(access_token)
        .bind(refresh_token)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        info!("Stored credentials for owner: {}", owner_key);

        Ok(Credentials {
            owner_key: owner_key.to_string(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Persist a renewed access token, and the rotated refresh token when the
    /// token endpoint issued one
    pub async fn rotate(
        &self,
        owner_key: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE credentials
            SET access_token = ?, refresh_token = COALESCE(?, refresh_token), updated_at = ?
            WHERE owner_key = ?
            "#,
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(Utc::now())
        .bind(owner_key)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// List all stored credentials
    pub async fn list(&self) -> Result<Vec<Credentials>> {
        let rows = sqlx::query_as::<_, Credentials>(
            r#"
            SELECT owner_key, access_token, refresh_token, created_at, updated_at
            FROM credentials
            ORDER BY owner_key ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}
