//! Database side of an import: staging, swap and view refresh
//!
//! A session owns one PostgreSQL transaction from the first DDL statement to
//! the final rename. The transaction also holds the table's advisory lock, so
//! a second process importing the same table waits until this one commits or
//! rolls back. Dropping a session without swapping rolls everything back and
//! the staging table disappears with it.

use async_trait::async_trait;
use reel_common::TargetTable;
use sqlx::{PgPool, Postgres, Transaction};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use super::schema;

/// Size of each buffer streamed to `COPY ... FROM STDIN`
const COPY_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unsupported table: {0}")]
    UnsupportedTable(String),

    #[error("Source file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("Import session already finished")]
    SessionClosed,

    #[error("Failed to refresh mv_movie_ratings: {0}")]
    Refresh(sqlx::Error),
}

impl From<reel_common::ReelError> for ImportError {
    fn from(err: reel_common::ReelError) -> Self {
        match err {
            reel_common::ReelError::UnsupportedTable(name) => ImportError::UnsupportedTable(name),
            other => ImportError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// One staging+swap run against a single target table
#[async_trait]
pub trait ImportSession: Send {
    /// Load `path` into a fresh staging table and return its row count
    async fn stage(&mut self, path: &Path) -> Result<i64, ImportError>;

    /// Replace the live table with the staging table and commit
    async fn swap(&mut self) -> Result<(), ImportError>;

    /// Rows counted so far, reported when a later step fails
    fn rows_staged(&self) -> i64;
}

#[async_trait]
pub trait ImportBackend: Send + Sync {
    /// Start a session, blocking until no other process is importing `table`
    async fn open_session(&self, table: TargetTable) -> Result<Box<dyn ImportSession>, ImportError>;

    /// Rebuild the aggregate movie-ratings view from the live tables
    async fn refresh_derived_view(&self) -> Result<(), ImportError>;
}

/// PostgreSQL implementation of the import backend
#[derive(Clone)]
pub struct PgImportBackend {
    pool: PgPool,
}

impl PgImportBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportBackend for PgImportBackend {
    async fn open_session(&self, table: TargetTable) -> Result<Box<dyn ImportSession>, ImportError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(schema::import_lock_key(table))
            .execute(&mut *tx)
            .await?;

        tracing::debug!(table = %table, "Acquired import lock");

        Ok(Box::new(PgImportSession {
            table,
            tx: Some(tx),
            rows_staged: 0,
        }))
    }

    async fn refresh_derived_view(&self) -> Result<(), ImportError> {
        let mut tx = self.pool.begin().await.map_err(ImportError::Refresh)?;

        sqlx::query(schema::DROP_VIEW_SQL)
            .execute(&mut *tx)
            .await
            .map_err(ImportError::Refresh)?;
        sqlx::query(schema::CREATE_VIEW_SQL)
            .execute(&mut *tx)
            .await
            .map_err(ImportError::Refresh)?;

        tx.commit().await.map_err(ImportError::Refresh)?;

        tracing::info!(view = schema::MOVIE_RATINGS_VIEW, "Materialized view recreated");
        Ok(())
    }
}

pub struct PgImportSession {
    table: TargetTable,
    tx: Option<Transaction<'static, Postgres>>,
    rows_staged: i64,
}

impl PgImportSession {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, ImportError> {
        self.tx.as_mut().ok_or(ImportError::SessionClosed)
    }
}

#[async_trait]
impl ImportSession for PgImportSession {
    async fn stage(&mut self, path: &Path) -> Result<i64, ImportError> {
        let table = self.table;

        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ImportError::FileNotFound(path.to_path_buf()))
            },
            Err(e) => return Err(e.into()),
        };

        let tx = self.tx()?;

        sqlx::query(&schema::drop_staging_sql(table)).execute(&mut **tx).await?;
        sqlx::query(&schema::create_staging_sql(table)).execute(&mut **tx).await?;

        tracing::info!(
            table = %table,
            staging = %table.staging_name(),
            path = %path.display(),
            "Copying data into staging table"
        );

        let mut copy = tx.copy_in_raw(&schema::copy_sql(table)).await?;
        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        let mut bytes_sent: u64 = 0;
        loop {
            let n = match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    copy.abort(format!("source read failed: {e}")).await?;
                    return Err(e.into());
                },
            };
            copy.send(&buf[..n]).await?;
            bytes_sent += n as u64;
        }
        copy.finish().await?;

        let tx = self.tx()?;
        let (count,): (i64,) = sqlx::query_as(&schema::count_staging_sql(table))
            .fetch_one(&mut **tx)
            .await?;
        self.rows_staged = count;

        if let Some(sql) = schema::convert_timestamp_sql(table) {
            let tx = self.tx()?;
            sqlx::query(&sql).execute(&mut **tx).await?;
        }

        tracing::debug!(table = %table, rows = count, bytes = bytes_sent, "Staging complete");
        Ok(count)
    }

    async fn swap(&mut self) -> Result<(), ImportError> {
        let table = self.table;
        let mut tx = self.tx.take().ok_or(ImportError::SessionClosed)?;

        sqlx::query(&schema::drop_live_sql(table)).execute(&mut *tx).await?;
        sqlx::query(&schema::rename_staging_sql(table)).execute(&mut *tx).await?;
        sqlx::query(&schema::rename_staging_pkey_sql(table)).execute(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(table = %table, "Staging table promoted to live table");
        Ok(())
    }

    fn rows_staged(&self) -> i64 {
        self.rows_staged
    }
}
