//! Document store and full-text search
//!
//! Backs the retrieval collaborator with SQLite FTS5. Scores are negated
//! bm25 ranks so that higher means more relevant, matching the `Retriever`
//! contract.

use crate::retrieval::{RetrievedDocument, Retriever};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// Repository for the document store
#[derive(Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add (or replace) a document under a stable source id
    pub async fn add_document(&self, source_id: &str, content: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO documents (source_id, content) VALUES (?, ?) \
             ON CONFLICT(source_id) DO UPDATE SET content = excluded.content",
        )
        .bind(source_id)
        .bind(content)
        .execute(&self.pool)
        .await
        .context("Failed to add document")?;
        Ok(())
    }

    /// Number of stored documents
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count documents")?;
        Ok(count)
    }

    /// Full-text search over the store, best matches first
    pub async fn search_documents(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let Some(match_expr) = build_match_expression(query) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            "SELECT content, source_id, rank FROM documents_fts \
             WHERE documents_fts MATCH ? ORDER BY rank LIMIT ?",
        )
        .bind(&match_expr)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to execute FTS query on documents_fts")?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                RetrievedDocument {
                    content: row.get("content"),
                    source_id: row.get("source_id"),
                    // bm25 rank is negative-better; flip so higher is better
                    score: -rank,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Retriever for DocumentRepository {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDocument>> {
        self.search_documents(query, top_k).await
    }
}

/// Turn free text into an FTS5 MATCH expression.
///
/// FTS5 treats punctuation as syntax, so each alphanumeric term is quoted
/// and terms are OR-ed together. Returns `None` when the query has no
/// searchable terms at all.
fn build_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}
