//! pgvector-backed store using cosine distance (`<=>`).

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use pgvector::Vector;
use serde::Serialize;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, warn};

use super::{TableName, VectorStore};
use crate::error::{RagError, Result};
use crate::record::{EmbeddingVector, Match, NewRecord, RecordId};

/// Chunk table in Postgres with a `VECTOR(d)` column.
pub struct PgVectorStore {
    client: Client,
    table: TableName,
    insert_sql: String,
    search_sql: String,
    dimensions: Option<usize>,
}

/// Lightweight row listing used by the inspection tool.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    /// Record identifier.
    pub id: RecordId,
    /// Document title.
    pub title: String,
    /// Source filename.
    pub source: String,
    /// Chunk position within the source.
    pub sequence_index: i64,
}

impl PgVectorStore {
    /// Connects and reads the embedding dimension of an existing table.
    ///
    /// Connection problems are configuration failures: nothing can run without the store.
    pub async fn connect(database_url: &str, table: TableName) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|err| RagError::config(format!("failed to connect to Postgres: {err}")))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!("postgres connection error: {err}");
            }
        });
        let mut store = Self {
            client,
            insert_sql: insert_sql(&table),
            search_sql: search_sql(&table),
            table,
            dimensions: None,
        };
        store.dimensions = store
            .column_dimensions()
            .await
            .map_err(|err| RagError::config(format!("{err:#}")))?;
        debug!(
            table = %store.table.qualified(),
            dimensions = ?store.dimensions,
            "connected to pgvector store"
        );
        Ok(store)
    }

    /// Creates the extension, table, and index when missing.
    ///
    /// Fails with a configuration error when the table already exists with a
    /// different embedding dimension.
    pub async fn prepare(&mut self, dims: usize) -> Result<()> {
        if dims == 0 {
            return Err(RagError::config("embedding dimension must be positive"));
        }
        if let Some(existing) = self.dimensions {
            if existing != dims {
                return Err(RagError::config(format!(
                    "{} stores {existing}-dimension embeddings but the embedder produces {dims}",
                    self.table.qualified()
                )));
            }
        }
        self.ensure_schema(dims)
            .await
            .map_err(|err| RagError::config(format!("{err:#}")))?;
        self.dimensions = Some(dims);
        Ok(())
    }

    /// Fails unless the table exists; used by read-only callers.
    pub fn require_table(&self) -> Result<usize> {
        self.dimensions.ok_or_else(|| {
            RagError::config(format!(
                "{} does not exist; run skillcoach-ingest first",
                self.table.qualified()
            ))
        })
    }

    /// Table this store reads and writes.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Number of stored records.
    pub async fn count(&self) -> anyhow::Result<i64> {
        let sql = format!("SELECT COUNT(*) AS total FROM {}", self.table.qualified());
        let row = self
            .client
            .query_one(sql.as_str(), &[])
            .await
            .context("failed to count records")?;
        Ok(row.try_get("total")?)
    }

    /// First `limit` records in insertion order.
    pub async fn sample(&self, limit: usize) -> anyhow::Result<Vec<RecordSummary>> {
        let sql = format!(
            "SELECT id, title, source, sequence_index FROM {} ORDER BY id ASC LIMIT $1",
            self.table.qualified()
        );
        let limit = i64::try_from(limit).map_err(|_| anyhow!("limit {limit} exceeds i64"))?;
        let rows = self
            .client
            .query(sql.as_str(), &[&limit])
            .await
            .context("failed to list records")?;
        rows.iter()
            .map(|row| -> anyhow::Result<RecordSummary> {
                Ok(RecordSummary {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    source: row.try_get("source")?,
                    sequence_index: row.try_get("sequence_index")?,
                })
            })
            .collect()
    }

    async fn column_dimensions(&self) -> anyhow::Result<Option<usize>> {
        let row = self
            .client
            .query_opt(
                "SELECT a.atttypmod AS dims \
                 FROM pg_attribute a \
                 JOIN pg_class c ON a.attrelid = c.oid \
                 JOIN pg_namespace n ON c.relnamespace = n.oid \
                 WHERE n.nspname = $1 AND c.relname = $2 \
                   AND a.attname = 'embedding' AND NOT a.attisdropped",
                &[&self.table.schema(), &self.table.table()],
            )
            .await
            .context("failed to inspect embedding column")?;
        let Some(row) = row else {
            return Ok(None);
        };
        let dims: i32 = row.try_get("dims")?;
        anyhow::ensure!(
            dims > 0,
            "{} has an unsized embedding column",
            self.table.qualified()
        );
        Ok(Some(dims as usize))
    }

    async fn ensure_schema(&self, dims: usize) -> anyhow::Result<()> {
        self.client
            .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
            .await
            .context("failed to ensure pgvector extension")?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                source TEXT NOT NULL,
                chunk TEXT NOT NULL,
                sequence_index BIGINT NOT NULL,
                embedding VECTOR({dims}) NOT NULL
            )",
            self.table.qualified()
        );
        self.client
            .execute(ddl.as_str(), &[])
            .await
            .context("failed to create chunk table")?;
        let index = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (source, sequence_index)",
            self.table.source_index_name(),
            self.table.qualified()
        );
        self.client
            .execute(index.as_str(), &[])
            .await
            .context("failed to ensure source index")?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn insert(&self, record: &NewRecord) -> anyhow::Result<RecordId> {
        if let Some(dims) = self.dimensions {
            anyhow::ensure!(
                record.embedding.dimensions() == dims,
                "embedding has {} dimensions, table expects {}",
                record.embedding.dimensions(),
                dims
            );
        }
        let vector = Vector::from(record.embedding.as_slice().to_vec());
        let sequence_index = i64::try_from(record.sequence_index)
            .map_err(|_| anyhow!("sequence index {} exceeds i64", record.sequence_index))?;
        let row = self
            .client
            .query_one(
                self.insert_sql.as_str(),
                &[
                    &record.title,
                    &record.source,
                    &record.chunk,
                    &sequence_index,
                    &vector,
                ],
            )
            .await
            .with_context(|| {
                format!(
                    "failed to insert chunk {} from {}",
                    record.sequence_index, record.source
                )
            })?;
        Ok(row.try_get("id")?)
    }

    async fn search(&self, query: &EmbeddingVector, k: usize) -> anyhow::Result<Vec<Match>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = Vector::from(query.as_slice().to_vec());
        let limit = i64::try_from(k).map_err(|_| anyhow!("k {k} exceeds i64"))?;
        let rows = self
            .client
            .query(self.search_sql.as_str(), &[&vector, &limit])
            .await
            .context("nearest-neighbor query failed")?;
        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            match match_from_row(&row) {
                Ok(m) => matches.push(m),
                Err(err) => warn!("skipping malformed match row: {err:#}"),
            }
        }
        Ok(matches)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }
}

fn match_from_row(row: &Row) -> anyhow::Result<Match> {
    let id: RecordId = row.try_get("id")?;
    let title: String = row.try_get("title")?;
    let source: String = row.try_get("source")?;
    let chunk: String = row.try_get("chunk")?;
    let similarity: Option<f64> = row.try_get("similarity")?;
    let similarity = similarity.ok_or_else(|| anyhow!("record {id} has no similarity"))?;
    Match::validated(id, title, source, chunk, similarity)
}

fn insert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (title, source, chunk, sequence_index, embedding) \
            VALUES ($1, $2, $3, $4, $5) \
            RETURNING id",
        table.qualified()
    )
}

fn search_sql(table: &TableName) -> String {
    format!(
        "SELECT \
            id, \
            title, \
            source, \
            chunk, \
            (1 - (embedding <=> $1))::float8 AS similarity \
        FROM {} \
        ORDER BY embedding <=> $1 ASC, id ASC \
        LIMIT $2",
        table.qualified()
    )
}
