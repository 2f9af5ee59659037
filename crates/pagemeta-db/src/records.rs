//! Metadata record repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use pagemeta_core::{Error, MetadataRecord, MetadataRepository, NewMetadataRecord, Result};

/// PostgreSQL implementation of MetadataRepository.
#[derive(Clone)]
pub struct PgMetadataRepository {
    pool: Pool<Postgres>,
}

impl PgMetadataRepository {
    /// Create a new PgMetadataRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_record_row(row: sqlx::postgres::PgRow) -> MetadataRecord {
        MetadataRecord {
            id: row.get("id"),
            url: row.get("url"),
            title: row.get("title"),
            description: row.get("description"),
            keywords: row.get("keywords"),
            processed: row.get("processed"),
        }
    }
}

/// Map a unique-index violation on `metadata.url` to `Error::DuplicateUrl`.
fn map_insert_error(err: sqlx::Error, url: &str) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::DuplicateUrl(url.to_string())
        }
        _ => Error::Database(err),
    }
}

#[async_trait]
impl MetadataRepository for PgMetadataRepository {
    async fn insert_batch(&self, records: &[NewMetadataRecord]) -> Result<Vec<i64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO metadata (url, title, description, keywords, processed)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id",
            )
            .bind(&record.url)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.keywords)
            .bind(record.processed)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, &record.url))?;
            ids.push(id);
        }

        // Dropping `tx` on the error paths above rolls the whole batch back.
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "metadata",
            op = "insert_batch",
            count = ids.len(),
            "Inserted metadata records"
        );
        Ok(ids)
    }

    async fn get(&self, id: i64) -> Result<Option<MetadataRecord>> {
        let row = sqlx::query(
            "SELECT id, url, title, description, keywords, processed
             FROM metadata WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_record_row))
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<MetadataRecord>> {
        let row = sqlx::query(
            "SELECT id, url, title, description, keywords, processed
             FROM metadata WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_record_row))
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metadata")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count.0)
    }
}
