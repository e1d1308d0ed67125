use std::str::FromStr;

use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::MemoryError;
use crate::types::DocumentId;

/// Full document row, including the extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub filename: String,
    pub upload_date: String,
    pub text_content: String,
}

/// Document row without its text, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub filename: String,
    pub upload_date: String,
    pub chars: i64,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    /// Open (or create) the `SQLite` database and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database on a single connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

        // Every in-memory connection is a separate database.
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(path, "document store ready");

        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Store a document and return its new ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn insert(&self, filename: &str, text: &str) -> Result<DocumentId, MemoryError> {
        let row: (DocumentId,) = sqlx::query_as(
            "INSERT INTO documents (filename, text_content) VALUES (?, ?) RETURNING id",
        )
        .bind(filename)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, id: DocumentId) -> Result<Option<StoredDocument>, MemoryError> {
        let row: Option<(DocumentId, String, String, String)> = sqlx::query_as(
            "SELECT id, filename, upload_date, text_content FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(id, filename, upload_date, text_content)| StoredDocument {
                id,
                filename,
                upload_date,
                text_content,
            },
        ))
    }

    /// List all documents, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self) -> Result<Vec<DocumentSummary>, MemoryError> {
        let rows: Vec<(DocumentId, String, String, i64)> = sqlx::query_as(
            "SELECT id, filename, upload_date, length(text_content) FROM documents ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, filename, upload_date, chars)| DocumentSummary {
                id,
                filename,
                upload_date,
                chars,
            })
            .collect())
    }

    /// Delete a document. Returns `false` if no such document existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete(&self, id: DocumentId) -> Result<bool, MemoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
